//! Validation configuration parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::{validate_config_schema, SchemaViolation};

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config does not match schema: {}", join_violations(.0))]
    SchemaError(Vec<SchemaViolation>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tolerances and ceilings for the Mathematical Validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Allowed absolute difference for CTR/CVR, in percentage points
    pub rate_tolerance_pp: f64,

    /// Allowed relative difference for CPC/ROAS (0.01 = 1%)
    pub cost_relative_tolerance: f64,

    /// Rates above this percentage are flagged AMBER
    pub plausible_rate_ceiling: f64,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            rate_tolerance_pp: 0.1,
            cost_relative_tolerance: 0.01,
            plausible_rate_ceiling: 20.0,
        }
    }
}

/// Settings for the Citation/Fabrication Validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CitationConfig {
    /// Section headers the narrative must carry. Empty disables the check.
    pub required_sections: Vec<String>,
}

/// Weights of the final quality-assurance sub-scores. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaWeights {
    pub citation_quality: f64,
    pub insight_density: f64,
    pub readability: f64,
    pub actionability: f64,
    pub professional_tone: f64,
}

impl QaWeights {
    pub fn total(&self) -> f64 {
        self.citation_quality
            + self.insight_density
            + self.readability
            + self.actionability
            + self.professional_tone
    }
}

impl Default for QaWeights {
    fn default() -> Self {
        Self {
            citation_quality: 0.20,
            insight_density: 0.20,
            readability: 0.15,
            actionability: 0.25,
            professional_tone: 0.20,
        }
    }
}

/// Numeric thresholds for the seven quality gates.
///
/// The checklists themselves are fixed; only these numbers move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    /// Pass threshold for gates 1-6
    pub pass_threshold: f64,
    /// Pass threshold for the final quality-assurance gate
    pub final_threshold: f64,

    // Data gathering
    pub min_sources: usize,
    pub min_source_types: usize,
    pub min_fresh_share: f64,
    pub freshness_days: i64,

    // Fact extraction
    pub min_facts: usize,
    pub min_categories: usize,
    pub min_high_relevance: usize,
    pub relevance_cutoff: u8,

    // Verification
    pub min_high_confidence_share: f64,
    pub max_low_confidence_share: f64,

    // Analysis
    pub facts_per_insight: usize,
    pub min_supporting_facts: usize,
    pub min_implication_share: f64,
    pub min_patterns: usize,

    // Brief generation
    pub summary_words_min: usize,
    pub summary_words_max: usize,
    pub min_citation_ratio: f64,
    pub min_brief_words: usize,
    pub required_sections: Vec<String>,

    // Final quality assurance
    pub qa_weights: QaWeights,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            pass_threshold: 80.0,
            final_threshold: 85.0,
            min_sources: 10,
            min_source_types: 3,
            min_fresh_share: 0.7,
            freshness_days: 180,
            min_facts: 30,
            min_categories: 5,
            min_high_relevance: 15,
            relevance_cutoff: 7,
            min_high_confidence_share: 0.5,
            max_low_confidence_share: 0.2,
            facts_per_insight: 3,
            min_supporting_facts: 2,
            min_implication_share: 0.8,
            min_patterns: 3,
            summary_words_min: 150,
            summary_words_max: 250,
            min_citation_ratio: 0.7,
            min_brief_words: 2000,
            required_sections: vec![
                "Executive Summary".to_string(),
                "Key Findings".to_string(),
                "Analysis".to_string(),
                "Recommendations".to_string(),
                "Sources".to_string(),
            ],
            qa_weights: QaWeights::default(),
        }
    }
}

/// Complete configuration for gates, validators and the decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// BLOCK once this many HIGH issues accumulate
    pub high_issue_block_threshold: usize,

    pub math: MathConfig,
    pub citation: CitationConfig,
    pub gates: GateThresholds,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            high_issue_block_threshold: 3,
            math: MathConfig::default(),
            citation: CitationConfig::default(),
            gates: GateThresholds::default(),
        }
    }
}

impl ValidationConfig {
    /// Parse a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let json = serde_json::to_value(value)?;
        Self::from_value(json)
    }

    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Parse a config from an already-decoded document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        let value = if value.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            value
        };

        validate_config_schema(&value).map_err(ConfigError::SchemaError)?;

        let config: ValidationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_issue_block_threshold == 0 {
            return Err(ConfigError::Invalid(
                "high_issue_block_threshold must be at least 1".to_string(),
            ));
        }

        let gates = &self.gates;
        for (name, value) in [
            ("gates.pass_threshold", gates.pass_threshold),
            ("gates.final_threshold", gates.final_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 100], got {}",
                    name, value
                )));
            }
        }

        if gates.summary_words_min > gates.summary_words_max {
            return Err(ConfigError::Invalid(format!(
                "gates.summary_words_min ({}) exceeds gates.summary_words_max ({})",
                gates.summary_words_min, gates.summary_words_max
            )));
        }

        if gates.facts_per_insight == 0 {
            return Err(ConfigError::Invalid(
                "gates.facts_per_insight must be at least 1".to_string(),
            ));
        }

        let total = gates.qa_weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "gates.qa_weights must sum to 1.0, got {:.4}",
                total
            )));
        }

        if self.math.rate_tolerance_pp < 0.0 || self.math.cost_relative_tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "math tolerances must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}
