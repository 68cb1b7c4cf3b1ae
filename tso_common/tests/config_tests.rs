//! File-based configuration loading tests.

use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tso_common::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};

#[derive(Debug, Deserialize)]
struct TestConfig {
    #[serde(default)]
    shared: SharedConfig,
    cycle_period_us: u64,
}

impl Validate for TestConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.cycle_period_us == 0 {
            return Err(ConfigError::invalid("test", "cycle_period_us", "must be positive"));
        }
        Ok(())
    }
}

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_loader_file_not_found() {
    let path = Path::new("/nonexistent/path/demo.toml");
    let result = TestConfig::load(path);
    assert_eq!(
        result.unwrap_err(),
        ConfigError::FileNotFound {
            path: path.to_path_buf()
        }
    );
}

#[test]
fn test_config_loader_parse_error_names_file() {
    let file = write_config("invalid toml {{");

    let result = TestConfig::load(file.path());
    match result {
        Err(ConfigError::ParseError { origin, .. }) => {
            assert_eq!(origin, file.path().display().to_string());
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_config_loader_success() {
    let file = write_config(
        r#"cycle_period_us = 1000

[shared]
log_level = "debug"
service_name = "tso-demo"
"#,
    );

    let config = TestConfig::load_validated(file.path()).unwrap();
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.shared.service_name, "tso-demo");
    assert_eq!(config.cycle_period_us, 1000);
}

#[test]
fn test_shared_config_defaults_when_section_missing() {
    let file = write_config("cycle_period_us = 500\n");

    let config = TestConfig::load(file.path()).unwrap();
    assert_eq!(config.shared, SharedConfig::default());
    assert_eq!(config.shared.log_level, LogLevel::Info);
}

#[test]
fn test_load_validated_rejects_out_of_range() {
    let file = write_config("cycle_period_us = 0\n");

    assert!(TestConfig::load(file.path()).is_ok());
    assert_eq!(
        TestConfig::load_validated(file.path()).unwrap_err(),
        ConfigError::invalid("test", "cycle_period_us", "must be positive")
    );
}
