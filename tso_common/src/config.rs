//! Configuration loading for workspace binaries.
//!
//! Every binary reads one TOML file with a `[shared]` section plus its own
//! sections. Loading and validation go through [`ConfigLoader`]; types that
//! check their own bounds implement [`Validate`] so that
//! [`ConfigLoader::load_validated`] rejects a bad file before any object or
//! thread is created.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tso_common::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct BenchConfig {
//!     #[serde(default)]
//!     shared: SharedConfig,
//!     cycle_period_us: u64,
//! }
//!
//! impl Validate for BenchConfig {
//!     fn validate(&self) -> Result<(), ConfigError> {
//!         self.shared.validate()?;
//!         if self.cycle_period_us == 0 {
//!             return Err(ConfigError::invalid("bench", "cycle_period_us", "must be positive"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BenchConfig::load_validated(Path::new("bench.toml"))?;
//!     println!("{} at {} us", config.shared.service_name, config.cycle_period_us);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Origin reported for documents parsed from memory.
pub const INLINE_ORIGIN: &str = "<inline>";

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No file at the configured path.
    #[error("Configuration file not found: {}", path.display())]
    FileNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Failed to read {}: {message}", path.display())]
    Read {
        /// Path being read
        path: PathBuf,
        /// Underlying IO error text
        message: String,
    },

    /// TOML syntax or schema error.
    #[error("Failed to parse {origin}: {message}")]
    ParseError {
        /// File path, or [`INLINE_ORIGIN`]
        origin: String,
        /// Parser message, including the offending line
        message: String,
    },

    /// A value parsed but is out of range.
    #[error("Invalid [{section}] {key}: {reason}")]
    ValidationError {
        /// TOML table holding the key
        section: &'static str,
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Validation failure for `key` in table `section`.
    pub fn invalid(section: &'static str, key: &'static str, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            section,
            key,
            reason: reason.into(),
        }
    }
}

/// Log level for application logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every publish and wakeup.
    Trace,
    /// Object construction and thread lifecycle.
    Debug,
    /// Startup, shutdown and periodic status.
    #[default]
    Info,
    /// Resynchronizations after missed updates.
    Warn,
    /// Contract violations and fatal errors only.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// The `[shared]` section every workspace binary accepts.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "tso-demo-01"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Instance name written at startup and shutdown.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "tso-demo".to_string(),
        }
    }
}

/// Semantic checks run after a configuration parses.
pub trait Validate {
    /// Reject out-of-range values.
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validate for SharedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::invalid("shared", "service_name", "cannot be empty"));
        }
        if self.service_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(
                "shared",
                "service_name",
                format!("must not contain whitespace, got {:?}", self.service_name),
            ));
        }
        Ok(())
    }
}

/// Loading configuration from TOML.
///
/// Errors name the file they came from. Semantic checks are opt-in through
/// [`load_validated`](Self::load_validated).
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        parse_toml(&content, &path.display().to_string())
    }

    /// Parse configuration from an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        parse_toml(content, INLINE_ORIGIN)
    }

    /// [`load`](Self::load) followed by [`Validate::validate`].
    fn load_validated(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Validate,
    {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

// Any serde-deserializable struct is loadable.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

fn parse_toml<T>(content: &str, origin: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct LevelWrapper {
        level: LogLevel,
    }

    #[test]
    fn test_log_level_maps_to_tracing() {
        for (text, expected, level) in [
            ("trace", LogLevel::Trace, tracing::Level::TRACE),
            ("debug", LogLevel::Debug, tracing::Level::DEBUG),
            ("info", LogLevel::Info, tracing::Level::INFO),
            ("warn", LogLevel::Warn, tracing::Level::WARN),
            ("error", LogLevel::Error, tracing::Level::ERROR),
        ] {
            let parsed = LevelWrapper::from_toml(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, expected);
            assert_eq!(tracing::Level::from(expected), level);
        }
    }

    #[test]
    fn test_inline_parse_error_names_origin() {
        let result = LevelWrapper::from_toml("level = \"verbose\"");
        assert!(matches!(
            result,
            Err(ConfigError::ParseError { ref origin, .. }) if origin == INLINE_ORIGIN
        ));
    }

    #[test]
    fn test_shared_section_is_optional() {
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[serde(default)]
            shared: SharedConfig,
        }

        let outer = Outer::from_toml("").unwrap();
        assert_eq!(outer.shared, SharedConfig::default());
        assert!(outer.shared.validate().is_ok());
    }

    #[test]
    fn test_shared_config_validation() {
        let mut config = SharedConfig::default();
        config.service_name.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::invalid("shared", "service_name", "cannot be empty"))
        );

        config.service_name = "tso demo".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError {
                section: "shared",
                key: "service_name",
                ..
            })
        ));
    }

    #[test]
    fn test_validation_message_names_key() {
        let err = ConfigError::invalid("demo", "report_every", "must be positive");
        assert_eq!(err.to_string(), "Invalid [demo] report_every: must be positive");
    }
}
