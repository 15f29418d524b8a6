//! Configuration for gates, validators and the decision policy.
//!
//! Every field has a default; a config file only names what it changes.

mod parser;
mod schema;

pub use parser::{
    CitationConfig, ConfigError, GateThresholds, MathConfig, QaWeights, ValidationConfig,
};
pub use schema::{validate_config_schema, SchemaViolation};
