use casefill::config::{default_metadata, AppConfig, ConfigManager};
use casefill::MetadataColumn;
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.enrichment.reference_column, "Summary");
    assert_eq!(config.enrichment.identifier_column, "Test ID");
    assert_eq!(config.output.file_prefix, "filled_");
    assert!(config.output.directory.is_none());
    assert_eq!(config.logging.level, "warn");

    let names: Vec<&str> = config.metadata.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Test Type", "Phase", "Assignee ID", "Component Names"]
    );
    let offsets: Vec<usize> = config.metadata.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![1, 2, 3, 4]);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    assert!(template.contains("# [enrichment]"));
    assert!(template.contains("# [output]"));
    assert!(template.contains("# [logging]"));
    assert!(template.contains("# [[metadata]]"));
    assert!(template.contains("# version = \"0.1\""));
    assert!(template.contains("# reference_column = \"Summary\""));
    assert!(template.contains("# directory = null"));
    assert_eq!(template.matches("# Metadata Columns").count(), 1);

    // Every non-empty line is a comment, so the template alone changes nothing
    for line in template.lines() {
        assert!(
            line.is_empty() || line.starts_with('#'),
            "uncommented line: {}",
            line
        );
    }
}

#[test]
fn test_uncommented_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();
    let uncommented: String = template
        .lines()
        .filter(|l| l.starts_with("# ") && !l.contains("null"))
        .map(|l| l.trim_start_matches("# "))
        .filter(|l| l.starts_with('[') || l.contains(" = "))
        .collect::<Vec<_>>()
        .join("\n");
    let config: AppConfig = toml::from_str(&uncommented).expect("template should parse");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[enrichment]"));
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let first_path = config_manager
        .write_default_config(false)
        .expect("First write should succeed");
    let second_path = config_manager
        .write_default_config(true)
        .expect("Second write with force should succeed");

    assert_eq!(first_path, second_path);
}

#[test]
fn test_load_from_missing_path_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from_path(&config_manager.config_path("config.toml"))
        .expect("Should load default config");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_minimal_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");
    let config_path = config_manager.config_path("config.toml");

    let minimal_config = r#"
version = "0.1"

[enrichment]
reference_column = "Title"

[logging]
level = "debug"
"#;
    fs::write(&config_path, minimal_config).expect("Failed to write minimal config");

    let config = AppConfig::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(config.enrichment.reference_column, "Title");
    assert_eq!(config.enrichment.identifier_column, "Test ID"); // Default
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.metadata, default_metadata()); // Default
}

#[test]
fn test_load_custom_metadata_replaces_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    let config_path = config_manager.config_path("config.toml");

    fs::write(
        &config_path,
        r#"
[[metadata]]
name = "Labels"
value = "regression"
offset = 1
"#,
    )
    .unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(
        config.metadata,
        vec![MetadataColumn::new("Labels", "regression", 1)]
    );
}

#[test]
fn test_load_invalid_toml_reports_path() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    let config_path = config_manager.config_path("config.toml");
    fs::write(&config_path, "[enrichment\nreference_column = ").unwrap();

    let err = AppConfig::load_from_path(&config_path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut override_config = AppConfig::default();
    override_config.enrichment.identifier_column = "Case Key".to_string();
    override_config.output.directory = Some("out".to_string());

    base.merge(override_config);

    assert_eq!(base.enrichment.identifier_column, "Case Key");
    assert_eq!(base.output.directory.as_deref(), Some("out"));
    assert_eq!(base.enrichment.reference_column, "Summary"); // Still default
    assert_eq!(base.metadata.len(), 4); // Still default
}

#[test]
fn test_validate_config_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_validate_config_invalid_version() {
    let config = AppConfig {
        version: "1.0".to_string(),
        ..AppConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Unsupported config version"));
}

#[test]
fn test_validate_rejects_zero_offset() {
    let config = AppConfig {
        metadata: vec![MetadataColumn::new("Phase", "Testing", 0)],
        ..AppConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_duplicate_metadata() {
    let config = AppConfig {
        metadata: vec![
            MetadataColumn::new("Phase", "Testing", 1),
            MetadataColumn::new("Phase", "Release", 2),
        ],
        ..AppConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("defined twice"));
}

#[test]
fn test_validate_rejects_metadata_named_like_identifier() {
    let config = AppConfig {
        metadata: vec![MetadataColumn::new("Test ID", "x", 1)],
        ..AppConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_unknown_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_set_metadata_value() {
    let mut config = AppConfig::default();
    config
        .set_metadata_value("Component Names", "Payments")
        .unwrap();
    let meta = config
        .metadata
        .iter()
        .find(|m| m.name == "Component Names")
        .unwrap();
    assert_eq!(meta.value, "Payments");
    assert!(config.set_metadata_value("Priority", "High").is_err());
}
