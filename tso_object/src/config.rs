//! Object configuration

use serde::{Deserialize, Serialize};

/// What an object does when a wait detects a lost or merged update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViolationPolicy {
    /// Return the violation to the caller.
    #[default]
    Report,
    /// Log the violation and abort the process.
    Abort,
}

/// Per-object settings, usually embedded as an `[object]` TOML table.
///
/// ```toml
/// [object]
/// violation_policy = "abort"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectConfig {
    /// Handling of detected contract violations.
    pub violation_policy: ViolationPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tso::config::ConfigLoader;

    #[test]
    fn test_default_policy_reports() {
        assert_eq!(ObjectConfig::default().violation_policy, ViolationPolicy::Report);
    }

    #[test]
    fn test_policy_from_toml() {
        let config = ObjectConfig::from_toml("violation_policy = \"abort\"").unwrap();
        assert_eq!(config.violation_policy, ViolationPolicy::Abort);

        let config = ObjectConfig::from_toml("").unwrap();
        assert_eq!(config.violation_policy, ViolationPolicy::Report);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(ObjectConfig::from_toml("violation_policy = \"report\"\nretries = 3").is_err());
    }
}
