//! `veracity run <file>`
//!
//! Replays recorded stage data through the orchestrator. The file holds
//! either a list of tagged stage data or a script:
//!
//! ```yaml
//! request: {target: Acme}
//! stages:
//!   - stage: PLANNING
//!     target: Acme
//!     # ...
//! artifact:            # optional, validated once the run completes
//!   narrative: "..."
//! ```
//!
//! Several entries for one stage are used on successive attempts.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use veracity_core::{Artifact, GateSummary, StageData, ValidationResult};
use veracity_runtime::{
    JsonLinesSink, Orchestrator, OrchestratorConfig, PassthroughCorrector, PipelineRun,
    ReplayExecutor, TracingMetricsSink,
};

use super::{decision_exit_code, pass_exit_code, print_json, read_document, EXIT_BLOCK};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run script (JSON or YAML)
    pub file: PathBuf,

    /// Orchestrator config file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Append one JSON line per gate attempt to this file
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RunScript {
    Stages(Vec<StageData>),
    Full {
        #[serde(default)]
        request: serde_json::Value,
        stages: Vec<StageData>,
        #[serde(default)]
        artifact: Option<Artifact>,
    },
}

impl RunScript {
    pub fn into_parts(self) -> (serde_json::Value, Vec<StageData>, Option<Artifact>) {
        match self {
            RunScript::Stages(stages) => (serde_json::Value::Null, stages, None),
            RunScript::Full {
                request,
                stages,
                artifact,
            } => (request, stages, artifact),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run: PipelineRun,
    pub summary: GateSummary,
    pub error: Option<String>,
    pub artifact: Option<ValidationResult>,
}

pub async fn handle_run(args: RunArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => OrchestratorConfig::from_yaml_file(path)
            .with_context(|| format!("Invalid orchestrator config {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    let script: RunScript =
        serde_json::from_value(read_document(&args.file)?).context("Invalid run script")?;
    let (request, stages, artifact) = script.into_parts();

    let mut builder = Orchestrator::builder()
        .config(config)
        .executor(Arc::new(ReplayExecutor::from_entries(stages)))
        .corrector(Arc::new(PassthroughCorrector))
        .metrics_sink(Arc::new(TracingMetricsSink));
    if let Some(path) = &args.metrics_out {
        let sink = JsonLinesSink::append_to(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        builder = builder.metrics_sink(Arc::new(sink));
    }
    let orchestrator = builder.build()?;

    let output = execute(&orchestrator, request, artifact.as_ref()).await;
    print_json(&output)?;

    let code = match (&output.error, &output.artifact) {
        (Some(_), _) => EXIT_BLOCK,
        (None, Some(result)) => decision_exit_code(result.decision),
        (None, None) => pass_exit_code(output.summary.all_passed),
    };
    Ok(code)
}

/// Drive one run to the end and validate the artifact if it completed.
pub async fn execute(
    orchestrator: &Orchestrator,
    request: serde_json::Value,
    artifact: Option<&Artifact>,
) -> RunOutput {
    let mut run = orchestrator.start(request);
    let (summary, error) = match orchestrator.run(&mut run).await {
        Ok(summary) => (summary, None),
        Err(e) => {
            tracing::warn!(run_id = %run.run_id(), error = %e, "Run failed");
            (run.summary(), Some(e.to_string()))
        }
    };

    let artifact = match (&error, artifact) {
        (None, Some(artifact)) => Some(orchestrator.validate_artifact(artifact)),
        _ => None,
    };

    RunOutput {
        run,
        summary,
        error,
        artifact,
    }
}
