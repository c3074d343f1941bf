use casefill::error_display::{user_message, user_message_from_report};
use casefill::{logging, AppConfig, Args, ConfigManager, Outcome, RunOptions, APP_NAME};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;

/// Exit code when the reference column is missing from the input.
const EXIT_COLUMN_NOT_FOUND: i32 = 2;

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Configuration file written to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
    Ok(None)
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load(APP_NAME)?,
    };
    if let Some(name) = &args.reference_column {
        config.enrichment.reference_column = name.clone();
    }
    if let Some(name) = &args.identifier_column {
        config.enrichment.identifier_column = name.clone();
    }
    if args.no_metadata {
        config.metadata.clear();
    }
    for (column, value) in args.value_overrides().map_err(|e| eyre!(e))? {
        config.set_metadata_value(&column, &value)?;
    }
    config.validate()?;
    Ok(config)
}

fn run_options(args: &Args, config: &AppConfig) -> RunOptions {
    let mut opts = RunOptions::from_config(config);
    opts.format = args.format;
    opts.output = args.output.clone();
    if let Some(dir) = &args.output_dir {
        opts.output_dir = Some(dir.clone());
    }
    if let Some(prefix) = &args.prefix {
        opts.prefix = prefix.clone();
    }
    opts.dry_run = args.dry_run;
    opts
}

fn print_outcome(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }
    let report = &outcome.report;
    match &outcome.output {
        Some(path) => println!("Success! File processed: {}", path.display()),
        None => println!("Dry run: nothing written"),
    }
    println!(
        "{} rows, {} test cases, {} rows before the first test case",
        report.rows, report.groups, report.orphan_rows
    );
    if !report.inserted.is_empty() {
        println!("Inserted: {}", report.inserted.join(", "));
    }
    if !report.skipped.is_empty() {
        println!("Already present: {}", report.skipped.join(", "));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", user_message_from_report(&e, None));
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level, args.debug);

    let Some(path) = args.path.as_deref() else {
        return Err(eyre!("no input file given"));
    };
    let opts = run_options(&args, &config);
    match casefill::process_file(path, &opts) {
        Ok(outcome) => print_outcome(&outcome, args.json),
        Err(e) => {
            eprintln!("Error: {}", user_message(&e));
            let code = if e.is_column_not_found() {
                EXIT_COLUMN_NOT_FOUND
            } else {
                1
            };
            std::process::exit(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["casefill", "cases.xlsx"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn empty_config_path(dir: &TempDir) -> String {
        dir.path().join("config.toml").to_string_lossy().into_owned()
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = TempDir::new().unwrap();
        let cfg = empty_config_path(&dir);
        let args = parse(&[
            "--config",
            &cfg,
            "-r",
            "Title",
            "--value",
            "Assignee ID=jdoe",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.enrichment.reference_column, "Title");
        let assignee = config
            .metadata
            .iter()
            .find(|m| m.name == "Assignee ID")
            .unwrap();
        assert_eq!(assignee.value, "jdoe");
    }

    #[test]
    fn test_unknown_value_column_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cfg = empty_config_path(&dir);
        let args = parse(&["--config", &cfg, "--value", "Priority=High"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_no_metadata() {
        let dir = TempDir::new().unwrap();
        let cfg = empty_config_path(&dir);
        let args = parse(&["--config", &cfg, "--no-metadata"]);
        let config = load_config(&args).unwrap();
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_run_options_from_args() {
        let args = parse(&["--output-dir", "out", "--prefix", "xray_", "--dry-run"]);
        let opts = run_options(&args, &AppConfig::default());
        assert_eq!(opts.output_dir, Some(PathBuf::from("out")));
        assert_eq!(opts.prefix, "xray_");
        assert!(opts.dry_run);
        assert!(opts.output.is_none());
    }
}
