//! Integration tests for `helmscan config`.
//!
//! Tests config validation and display functionality with real TOML files.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use helmscan_cli::cli::{ConfigAction, ConfigArgs, OutputFormat};
use helmscan_cli::commands::config::{build_config_report, execute};
use helmscan_cli::output::OutputWriter;
use helmscan_core::config::HelmscanConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("helmscan.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "pretty"

[render]
release = "audit"
namespace = "web"
set = ["image.tag=1.25"]

[scan]
backends = ["grype", "trivy"]
concurrency = 8

[report]
scope = "image"
write_csv = false
"#;
    fs::write(&config_path, valid_config).expect("should write config");

    // When: Validating the config
    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let result = execute(args, &config_path, &OutputWriter::new(OutputFormat::Json)).await;

    // Then: Should succeed
    assert!(result.is_ok(), "valid config should validate: {result:?}");
}

#[tokio::test]
async fn test_config_validate_malformed_toml_exits_with_config_code() {
    // Given: A malformed TOML file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write config");

    // When: Validating the config
    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let err = execute(args, &config_path, &OutputWriter::new(OutputFormat::Json))
        .await
        .expect_err("malformed TOML should fail");

    // Then: Exit code 2
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_config_validate_invalid_value() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("invalid.toml");
    fs::write(&config_path, "[scan]\nbackends = [\"clair\"]\n").expect("should write config");

    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let err = execute(args, &config_path, &OutputWriter::new(OutputFormat::Text))
        .await
        .expect_err("unknown backend should fail");
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_config_validate_missing_file_uses_defaults() {
    // Given: A nonexistent file path
    let config_path = PathBuf::from("/nonexistent/helmscan.toml");

    // When: Validating
    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let result = execute(args, &config_path, &OutputWriter::new(OutputFormat::Json)).await;

    // Then: Defaults are valid
    assert!(result.is_ok(), "missing file should fall back to defaults");
}

#[tokio::test]
async fn test_config_show_unknown_section() {
    let args = ConfigArgs {
        action: ConfigAction::Show {
            section: Some("database".to_owned()),
        },
    };
    let err = execute(
        args,
        &PathBuf::from("/nonexistent/helmscan.toml"),
        &OutputWriter::new(OutputFormat::Json),
    )
    .await
    .expect_err("unknown section should fail");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_config_show_reflects_file_values() {
    // Given: A config file overriding a few values
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("helmscan.toml");
    fs::write(
        &config_path,
        "[render]\nrelease = \"audit\"\n\n[report]\ncsv_path = \"/tmp/out.csv\"\n",
    )
    .expect("should write config");

    // When: Loading and building the report
    let config = HelmscanConfig::from_file(&config_path)
        .await
        .expect("config should load");
    let render = build_config_report(
        &config,
        config_path.display().to_string(),
        Some("render"),
    )
    .expect("render section");
    let report = build_config_report(&config, config_path.display().to_string(), Some("report"))
        .expect("report section");

    // Then: Each section only carries its own values
    assert!(render.config_toml.contains("audit"));
    assert!(!render.config_toml.contains("/tmp/out.csv"));
    assert!(report.config_toml.contains("/tmp/out.csv"));
}

#[tokio::test]
async fn test_config_unicode_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("unicode.toml");
    fs::write(
        &config_path,
        "[report]\ncsv_path = \"/보고서/결과.csv\"\n",
    )
    .expect("should write config");

    let config = HelmscanConfig::from_file(&config_path)
        .await
        .expect("unicode config should load");
    assert!(config.report.csv_path.contains("결과"));
}
