//! `veracity artifact <file> [--math-only]`

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use veracity_core::{Artifact, ArtifactValidator, ValidationMode};

use super::{decision_exit_code, load_validation_config, print_json, read_document};

#[derive(Args, Debug)]
pub struct ArtifactArgs {
    /// Artifact file with `narrative`, `facts`, `metrics` and `record_count`
    pub file: PathBuf,

    /// Skip citation and fabrication checks
    #[arg(long)]
    pub math_only: bool,

    /// Validation config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn handle_artifact(args: ArtifactArgs) -> Result<i32> {
    let config = load_validation_config(args.config.as_deref())?;
    let artifact: Artifact =
        serde_json::from_value(read_document(&args.file)?).context("Invalid artifact")?;

    let mode = if args.math_only {
        ValidationMode::MathOnly
    } else {
        ValidationMode::Full
    };
    let result = ArtifactValidator::new(mode, &config).validate(&artifact);
    tracing::info!(mode = ?mode, decision = %result.decision, "Artifact validated");

    print_json(&result)?;
    Ok(decision_exit_code(result.decision))
}
