//! Binary that emits command-line options markdown to stdout.
//!
//! Output is redirected to `docs/command-line-options.md` when the docs are
//! regenerated.

fn main() {
    print!("{}", casefill_cli::render_options_markdown());
}
