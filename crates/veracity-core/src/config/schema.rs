//! JSON Schema validation for configuration documents.
//!
//! Configs are checked against `schema/validation_config.schema.json`
//! before deserialization, so typos fail loudly instead of silently
//! falling back to defaults.

use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Embedded config schema (loaded at compile time).
const CONFIG_SCHEMA_JSON: &str = include_str!("../../schema/validation_config.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

/// One schema violation, pointing at the offending config key.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// Dotted key path such as `gates.min_fresh_share`; empty for the root.
    pub key: String,
    pub message: String,
}

impl SchemaViolation {
    fn from_pointer(pointer: &str, message: String) -> Self {
        let key = pointer
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self { key, message }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.key, self.message)
        }
    }
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;
        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a config JSON value against the schema.
///
/// Returns every violation, not just the first.
pub fn validate_config_schema(config_json: &serde_json::Value) -> Result<(), Vec<SchemaViolation>> {
    let validator = get_validator().map_err(|e| {
        vec![SchemaViolation {
            key: String::new(),
            message: e.to_string(),
        }]
    })?;

    let violations: Vec<SchemaViolation> = validator
        .iter_errors(config_json)
        .map(|e| SchemaViolation::from_pointer(&e.instance_path.to_string(), e.to_string()))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_passes() {
        assert!(validate_config_schema(&serde_json::json!({})).is_ok());
    }

    #[test]
    fn test_full_config_passes() {
        let value = serde_json::json!({
            "high_issue_block_threshold": 3,
            "math": {
                "rate_tolerance_pp": 0.1,
                "cost_relative_tolerance": 0.01,
                "plausible_rate_ceiling": 20.0
            },
            "citation": { "required_sections": ["Executive Summary"] },
            "gates": {
                "pass_threshold": 80,
                "final_threshold": 85,
                "min_sources": 10,
                "min_fresh_share": 0.7,
                "qa_weights": {
                    "citation_quality": 0.2,
                    "insight_density": 0.2,
                    "readability": 0.15,
                    "actionability": 0.25,
                    "professional_tone": 0.2
                }
            }
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_share_above_one_names_key() {
        let value = serde_json::json!({ "gates": { "min_fresh_share": 1.5 } });
        let violations = validate_config_schema(&value).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, "gates.min_fresh_share");
        assert!(violations[0].to_string().starts_with("gates.min_fresh_share: "));
    }

    #[test]
    fn test_wrong_type_fails() {
        let value = serde_json::json!({ "high_issue_block_threshold": "three" });
        let errors = validate_config_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_nested_unknown_field_points_at_parent() {
        let value = serde_json::json!({ "math": { "ctr_tolerance": 0.1 } });
        let violations = validate_config_schema(&value).unwrap_err();
        assert_eq!(violations[0].key, "math");
        assert!(violations[0].message.contains("ctr_tolerance"));
    }

    #[test]
    fn test_root_violation_has_no_key() {
        let value = serde_json::json!({ "surprise": true });
        let violations = validate_config_schema(&value).unwrap_err();
        assert_eq!(violations[0].key, "");
        assert_eq!(violations[0].to_string(), violations[0].message);
    }
}
