use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::enrich::{
    EnrichOptions, MetadataColumn, DEFAULT_IDENTIFIER_COLUMN, DEFAULT_REFERENCE_COLUMN,
};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments.
    /// Every line is commented out so defaults apply until the user uncomments it.
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        Self::comment_all_fields(toml_str, Self::collect_all_comments())
    }

    /// Collect all field comments into a map keyed by `section.field`
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        for (field, comment) in ENRICHMENT_COMMENTS {
            comments.insert(format!("enrichment.{}", field), comment.to_string());
        }
        for (field, comment) in OUTPUT_COMMENTS {
            comments.insert(format!("output.{}", field), comment.to_string());
        }
        for (field, comment) in LOGGING_COMMENTS {
            comments.insert(format!("logging.{}", field), comment.to_string());
        }
        for (field, comment) in METADATA_COMMENTS {
            comments.insert(format!("metadata.{}", field), comment.to_string());
        }

        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Comments for `[[metadata]]` entries are emitted once, on the first entry.
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# casefill configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut commented: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if current_section != section {
                    if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                        result.push_str(header.1);
                        result.push('\n');
                    }
                }
                current_section = section;
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if commented.insert(field_path.clone()) {
                    if let Some(comment) = comments.get(&field_path) {
                        for comment_line in comment.lines() {
                            result.push_str("# ");
                            result.push_str(comment_line);
                            result.push('\n');
                        }
                    }
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        if !commented.contains("output.directory") {
            result = Self::add_missing_output_directory(result, &comments);
        }

        result
    }

    /// `output.directory` is None by default and not serialized; show it as `null`.
    fn add_missing_output_directory(
        mut result: String,
        comments: &HashMap<String, String>,
    ) -> String {
        let header = "# [output]\n";
        if let Some(pos) = result.find(header) {
            let mut new_content = String::new();
            if let Some(comment) = comments.get("output.directory") {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str("# directory = null\n");
            result.insert_str(pos + header.len(), &new_content);
        }
        result
    }

    /// Extract section name from a TOML line like "[output]" or "[[metadata]]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed.trim_matches(|c| c == '[' || c == ']').to_string())
        } else {
            None
        }
    }

    /// Extract `section.field` from an assignment line
    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE_NAME);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// Metadata columns, inserted in this order
    pub metadata: Vec<MetadataColumn>,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "enrichment",
        "# ============================================================================\n# Test Case Grouping\n# ============================================================================",
    ),
    (
        "output",
        "# ============================================================================\n# Output File\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================",
    ),
    (
        "metadata",
        "# ============================================================================\n# Metadata Columns\n# ============================================================================\n# Each [[metadata]] entry adds one column. The value is written on the first row\n# of every test case and left empty on the step rows below it.\n# Copy the values from your project in the test-management tool.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub reference_column: String,
    pub identifier_column: String,
}

const ENRICHMENT_COMMENTS: &[(&str, &str)] = &[
    (
        "reference_column",
        "Column that holds the test case id and description on the first row of each case\nand is empty on the step rows that follow",
    ),
    (
        "identifier_column",
        "Name of the inserted column that repeats the reference value on every step row",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix added to the input file name
    pub file_prefix: String,
    /// Directory for output files. None = next to the input file.
    pub directory: Option<String>,
}

const OUTPUT_COMMENTS: &[(&str, &str)] = &[
    (
        "file_prefix",
        "Prefix added to the input file name, e.g. cases.xlsx -> filled_cases.xlsx",
    ),
    (
        "directory",
        "Directory for output files\nnull = write next to the input file",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of: error, warn, info, debug, trace
    pub level: String,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[(
    "level",
    "Log level on stderr: error, warn, info, debug, trace\nRUST_LOG overrides this; --debug forces debug",
)];

const METADATA_COMMENTS: &[(&str, &str)] = &[
    ("name", "Column header"),
    ("value", "Value written on the first row of each test case"),
    (
        "offset",
        "Position relative to the reference column (1 means directly after it)",
    ),
];

pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            enrichment: EnrichmentConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            metadata: default_metadata(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            reference_column: DEFAULT_REFERENCE_COLUMN.to_string(),
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: "filled_".to_string(),
            directory: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Test Type, Phase, Assignee ID and Component Names, right after the reference column.
pub fn default_metadata() -> Vec<MetadataColumn> {
    vec![
        MetadataColumn::new("Test Type", "Manual", 1),
        MetadataColumn::new("Phase", "Testing", 2),
        MetadataColumn::new("Assignee ID", "your_assignee_id", 3),
        MetadataColumn::new("Component Names", "Wealthify", 4),
    ]
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user file)
    pub fn load(app_name: &str) -> Result<Self> {
        let config_path = ConfigManager::new(app_name)?.config_path(CONFIG_FILE_NAME);
        Self::load_from_path(&config_path)
    }

    /// Load defaults merged with the file at `config_path` (if it exists), then validate
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let mut config = AppConfig::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(config_path).map_err(|e| {
                eyre!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            let user_config: AppConfig = toml::from_str(&content).map_err(|e| {
                eyre!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            config.merge(user_config);
        }

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        let defaults = AppConfig::default();
        if other.version != defaults.version {
            self.version = other.version;
        }
        self.enrichment.merge(other.enrichment);
        self.output.merge(other.output);
        self.logging.merge(other.logging);
        if other.metadata != defaults.metadata {
            self.metadata = other.metadata;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let reference = self.enrichment.reference_column.trim();
        let identifier = self.enrichment.identifier_column.trim();
        if reference.is_empty() {
            return Err(eyre!("enrichment.reference_column must not be empty"));
        }
        if identifier.is_empty() {
            return Err(eyre!("enrichment.identifier_column must not be empty"));
        }
        if reference == identifier {
            return Err(eyre!(
                "enrichment.identifier_column must differ from the reference column ({})",
                reference
            ));
        }

        let mut names = HashSet::new();
        for meta in &self.metadata {
            let name = meta.name.trim();
            if name.is_empty() {
                return Err(eyre!("metadata column names must not be empty"));
            }
            if name == reference || name == identifier {
                return Err(eyre!(
                    "metadata column \"{}\" clashes with the reference or identifier column",
                    name
                ));
            }
            if !names.insert(name) {
                return Err(eyre!("metadata column \"{}\" is defined twice", name));
            }
            if meta.offset == 0 {
                return Err(eyre!(
                    "metadata column \"{}\": offset must be at least 1",
                    name
                ));
            }
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(eyre!(
                "logging.level must be one of {}, got \"{}\"",
                LOG_LEVELS.join(", "),
                self.logging.level
            ));
        }

        Ok(())
    }

    /// Set the value of the metadata column named `column`
    pub fn set_metadata_value(&mut self, column: &str, value: &str) -> Result<()> {
        let Some(idx) = self.metadata.iter().position(|m| m.name == column) else {
            let known: Vec<&str> = self.metadata.iter().map(|m| m.name.as_str()).collect();
            return Err(eyre!(
                "no metadata column named \"{}\" (configured: {})",
                column,
                known.join(", ")
            ));
        };
        self.metadata[idx].value = value.to_string();
        Ok(())
    }

    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions::new(self.enrichment.reference_column.clone())
            .with_identifier_column(self.enrichment.identifier_column.clone())
            .with_metadata(self.metadata.clone())
    }
}

// Merge implementations for each config section
impl EnrichmentConfig {
    pub fn merge(&mut self, other: Self) {
        let defaults = Self::default();
        if other.reference_column != defaults.reference_column {
            self.reference_column = other.reference_column;
        }
        if other.identifier_column != defaults.identifier_column {
            self.identifier_column = other.identifier_column;
        }
    }
}

impl OutputConfig {
    pub fn merge(&mut self, other: Self) {
        let defaults = Self::default();
        if other.file_prefix != defaults.file_prefix {
            self.file_prefix = other.file_prefix;
        }
        if other.directory.is_some() {
            self.directory = other.directory;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.level != Self::default().level {
            self.level = other.level;
        }
    }
}
