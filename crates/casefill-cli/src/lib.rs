//! Shared CLI definitions for casefill.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Input file format (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Excel workbook (.xlsx, .xlsm, .xls, .xlsb, .ods); only the first sheet is read
    Excel,
    /// Comma-separated values
    Csv,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "xlsx", "csv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Excel),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Command-line arguments for casefill
#[derive(Clone, Parser, Debug)]
#[command(
    name = "casefill",
    version,
    about = "Prepare multi-step test case spreadsheets for bulk import",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Spreadsheet to process (not required with --generate-config)
    #[arg(required_unless_present = "generate_config", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Write the result to this file instead of filled_<name> next to the input
    #[arg(short = 'o', long = "output", value_name = "PATH", help_heading = OUTPUT_HEADING)]
    pub output: Option<PathBuf>,

    /// Directory for the default-named output file (ignored with --output)
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        conflicts_with = "output",
        help_heading = OUTPUT_HEADING,
    )]
    pub output_dir: Option<PathBuf>,

    /// Prefix added to the input file name to build the output file name (default: filled_)
    #[arg(long = "prefix", value_name = "TEXT", help_heading = OUTPUT_HEADING)]
    pub prefix: Option<String>,

    /// Read the input as this format instead of detecting it from the file extension
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Column whose non-empty cells start a new test case (default: Summary)
    #[arg(
        short = 'r',
        long = "reference-column",
        value_name = "NAME",
        help_heading = ENRICHMENT_HEADING,
    )]
    pub reference_column: Option<String>,

    /// Name of the inserted identifier column (default: Test ID)
    #[arg(long = "identifier-column", value_name = "NAME", help_heading = ENRICHMENT_HEADING)]
    pub identifier_column: Option<String>,

    /// Override the value of a configured metadata column. Use once per column, e.g. --value "Assignee ID=jdoe"
    #[arg(long = "value", value_name = "COLUMN=VALUE", help_heading = ENRICHMENT_HEADING)]
    pub values: Vec<String>,

    /// Only insert the identifier column; skip all metadata columns
    #[arg(long = "no-metadata", action, help_heading = ENRICHMENT_HEADING)]
    pub no_metadata: bool,

    /// Read configuration from this file instead of ~/.config/casefill/config.toml
    #[arg(long = "config", value_name = "PATH", help_heading = CONFIG_HEADING)]
    pub config: Option<PathBuf>,

    /// Process the file and print the summary without writing any output
    #[arg(long = "dry-run", action, help_heading = OUTPUT_HEADING)]
    pub dry_run: bool,

    /// Print the enrichment summary as JSON on stdout
    #[arg(long = "json", action, help_heading = OUTPUT_HEADING)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/casefill/config.toml
    #[arg(long = "generate-config", action, help_heading = CONFIG_HEADING)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action, help_heading = CONFIG_HEADING)]
    pub force: bool,
}

impl Args {
    /// Parse `--value COLUMN=VALUE` pairs. The first "=" separates the column from the value.
    pub fn value_overrides(&self) -> Result<Vec<(String, String)>, String> {
        self.values
            .iter()
            .map(|raw| match raw.split_once('=') {
                Some((col, val)) if !col.trim().is_empty() => {
                    Ok((col.trim().to_string(), val.to_string()))
                }
                _ => Err(format!(
                    "invalid --value `{}`: expected COLUMN=VALUE",
                    raw
                )),
            })
            .collect()
    }
}

const OUTPUT_HEADING: &str = "Output";
const ENRICHMENT_HEADING: &str = "Enrichment";
const CONFIG_HEADING: &str = "Configuration";

/// Headings in the order they appear in the generated docs. Options without a
/// heading are listed first under "General".
const DOC_SECTIONS: [&str; 4] = ["General", OUTPUT_HEADING, ENRICHMENT_HEADING, CONFIG_HEADING];

fn table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// `-o, --output <PATH>` style label; positionals are shown as `<PATH>`.
fn option_label(arg: &clap::Arg) -> String {
    let value = arg
        .get_value_names()
        .and_then(|names| names.first())
        .map(|name| format!("<{}>", name.as_str()))
        .unwrap_or_default();
    if arg.is_positional() {
        return value;
    }
    let mut flags: Vec<String> = arg.get_short().map(|c| format!("-{c}")).into_iter().collect();
    if let Some(long) = arg.get_long() {
        flags.push(format!("--{long}"));
    }
    let flags = flags.join(", ");
    if arg.get_action().takes_values() && !value.is_empty() {
        format!("{flags} {value}")
    } else {
        flags
    }
}

fn option_description(arg: &clap::Arg) -> String {
    let mut text = arg
        .get_help()
        .map(|h| table_cell(&h.to_string()))
        .unwrap_or_default();
    let choices: Vec<String> = arg
        .get_possible_values()
        .iter()
        .filter(|v| !v.is_hide_set())
        .map(|v| format!("`{}`", v.get_name()))
        .collect();
    if !choices.is_empty() {
        text.push_str(&format!(" (one of {})", choices.join(", ")));
    }
    text
}

/// Render the command-line options as markdown, one table per help heading.
///
/// Printed by the gen_docs binary.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = format!(
        "# casefill command line\n\n```\n{}\n```\n",
        cmd.render_usage()
    );
    for section in DOC_SECTIONS {
        let args: Vec<&clap::Arg> = cmd
            .get_arguments()
            .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"))
            .filter(|arg| arg.get_help_heading().unwrap_or("General") == section)
            .collect();
        if args.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {section}\n\n| Option | Description |\n|---|---|\n"));
        for arg in args {
            out.push_str(&format!(
                "| `{}` | {} |\n",
                option_label(arg),
                option_description(arg)
            ));
        }
    }
    out
}
