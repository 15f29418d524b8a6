//! Orchestrator configuration.
//!
//! ```yaml
//! max_retries: 3
//! validation_mode: full      # or math_only
//! validation:                # optional, see ValidationConfig
//!   high_issue_block_threshold: 3
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use veracity_core::{ConfigError, ValidationConfig, ValidationMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Attempts per gate before the run fails
    pub max_retries: u32,

    /// Validators run on the final artifact
    pub validation_mode: ValidationMode,

    pub validation: ValidationConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            validation_mode: ValidationMode::Full,
            validation: ValidationConfig::default(),
        }
    }
}

/// Top-level keys other than `validation`.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OrchestratorSection {
    max_retries: u32,
    validation_mode: ValidationMode,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            max_retries: defaults.max_retries,
            validation_mode: defaults.validation_mode,
        }
    }
}

impl OrchestratorConfig {
    /// Parse from a YAML string. The `validation` section goes through the
    /// same schema and semantic checks as a standalone validation config.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut json = serde_json::to_value(value)?;

        let is_null = json.is_null();
        let validation = match json.as_object_mut() {
            Some(map) => map.remove("validation").unwrap_or(serde_json::Value::Null),
            None if is_null => serde_json::Value::Null,
            None => {
                return Err(ConfigError::Invalid(
                    "orchestrator config must be a mapping".to_string(),
                ))
            }
        };

        let section: OrchestratorSection = if json.is_null() {
            OrchestratorSection::default()
        } else {
            serde_json::from_value(json)?
        };

        let config = Self {
            max_retries: section.max_retries,
            validation_mode: section.validation_mode,
            validation: ValidationConfig::from_value(validation)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        self.validation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.validation_mode, ValidationMode::Full);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = OrchestratorConfig::from_yaml("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
max_retries: 5
validation_mode: math_only
validation:
  high_issue_block_threshold: 2
  gates:
    min_sources: 8
"#;
        let config = OrchestratorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.validation_mode, ValidationMode::MathOnly);
        assert_eq!(config.validation.high_issue_block_threshold, 2);
        assert_eq!(config.validation.gates.min_sources, 8);
        assert_eq!(config.validation.gates.min_facts, 30);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let err = OrchestratorConfig::from_yaml("max_retries: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(OrchestratorConfig::from_yaml("max_retry: 3").is_err());
    }

    #[test]
    fn test_nested_validation_checked_against_schema() {
        let yaml = "validation:\n  gates:\n    pass_threshold: 140\n";
        let err = OrchestratorConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaError(_)));
    }
}
