//! `veracity config <file>`

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use veracity_core::ValidationConfig;
use veracity_runtime::OrchestratorConfig;

use super::{print_json, EXIT_APPROVE};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config file (YAML, or JSON by extension)
    pub file: PathBuf,

    /// Treat the file as an orchestrator config (`max_retries`,
    /// `validation_mode`, `validation`)
    #[arg(long)]
    pub orchestrator: bool,
}

/// Print the effective config with defaults filled in.
pub fn handle_config(args: ConfigArgs) -> Result<i32> {
    if args.orchestrator {
        let config = OrchestratorConfig::from_yaml_file(&args.file)
            .with_context(|| format!("Invalid orchestrator config {}", args.file.display()))?;
        print_json(&config)?;
    } else {
        let config = ValidationConfig::from_file(&args.file)
            .with_context(|| format!("Invalid config {}", args.file.display()))?;
        print_json(&config)?;
    }

    tracing::info!(file = %args.file.display(), "Config is valid");
    Ok(EXIT_APPROVE)
}
