//! `veracity gate <stage> <file>`

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;

use veracity_core::{validate_gate, GateId, StageData};

use super::{load_validation_config, pass_exit_code, print_json, read_document};

#[derive(Args, Debug)]
pub struct GateArgs {
    /// Stage number (1-7) or name, e.g. `data-gathering`
    pub stage: String,

    /// Stage data file (JSON or YAML)
    pub file: PathBuf,

    /// Validation config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Read stage data for a gate. A document carrying a `stage` tag is taken
/// as-is, so data for the wrong stage fails the gate instead of the parse.
pub fn stage_data(gate_id: GateId, document: serde_json::Value) -> Result<StageData> {
    if document.get("stage").is_some() {
        return serde_json::from_value(document).context("Invalid tagged stage data");
    }
    StageData::from_value(gate_id, document)
        .with_context(|| format!("Invalid data for {}", gate_id))
}

pub fn handle_gate(args: GateArgs) -> Result<i32> {
    let gate_id: GateId = args.stage.parse().map_err(|e: String| anyhow!(e))?;
    let config = load_validation_config(args.config.as_deref())?;
    let data = stage_data(gate_id, read_document(&args.file)?)?;

    let result = validate_gate(gate_id, &data, &config);
    tracing::info!(stage = ?gate_id, score = result.score, passed = result.passed(), "Gate evaluated");

    print_json(&result)?;
    Ok(pass_exit_code(result.passed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_payload_uses_named_stage() {
        let data = stage_data(GateId::BriefGeneration, json!({"text": "# Executive Summary"})).unwrap();
        assert_eq!(data.gate_id(), GateId::BriefGeneration);
    }

    #[test]
    fn test_tagged_payload_kept() {
        let data = stage_data(
            GateId::Planning,
            json!({"stage": "BRIEF_GENERATION", "text": "hello"}),
        )
        .unwrap();
        assert_eq!(data.gate_id(), GateId::BriefGeneration);

        let result = validate_gate(GateId::Planning, &data, &Default::default());
        assert!(!result.passed());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_malformed_payload_is_error() {
        assert!(stage_data(GateId::Analysis, json!({"insights": "none"})).is_err());
    }
}
