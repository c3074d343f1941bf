//! stderr logging via tracing-subscriber.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for the given settings. `RUST_LOG` takes precedence over both.
pub fn filter_directive(level: &str, debug: bool) -> String {
    if debug {
        "casefill=debug".to_string()
    } else {
        format!("casefill={}", level.to_lowercase())
    }
}

/// Install the global subscriber. Calling it twice is harmless; the second call is ignored.
pub fn init(level: &str, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, debug)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
