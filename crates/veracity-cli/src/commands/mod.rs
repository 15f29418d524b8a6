//! CLI command handlers
//!
//! Each handler returns the process exit code, or an error when its input
//! could not be read.

pub mod artifact;
pub mod config;
pub mod gate;
pub mod metrics;
pub mod run;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use veracity_core::{Decision, ValidationConfig};

pub const EXIT_APPROVE: i32 = 0;
pub const EXIT_WARN: i32 = 1;
pub const EXIT_BLOCK: i32 = 2;
pub const EXIT_INPUT_ERROR: i32 = 3;

pub fn decision_exit_code(decision: Decision) -> i32 {
    match decision {
        Decision::Approve => EXIT_APPROVE,
        Decision::Warn => EXIT_WARN,
        Decision::Block => EXIT_BLOCK,
    }
}

pub fn pass_exit_code(passed: bool) -> i32 {
    if passed {
        EXIT_APPROVE
    } else {
        EXIT_BLOCK
    }
}

/// Parse document text as YAML or JSON, picked by file extension.
pub fn parse_document(path: &Path, contents: &str) -> Result<serde_json::Value> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        serde_json::to_value(value).context("YAML document is not representable as JSON")
    } else {
        serde_json::from_str(contents).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

pub fn read_document(path: &Path) -> Result<serde_json::Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_document(path, &contents)
}

/// Load a validation config, or the defaults when no path is given.
pub fn load_validation_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::from_file(path)
            .with_context(|| format!("Invalid config {}", path.display())),
        None => Ok(ValidationConfig::default()),
    }
}

/// Pretty-print a result to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
