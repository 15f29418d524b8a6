//! `veracity metrics <file>`

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use veracity_core::{
    MathValidator, NumericMetricSet, QualityScorer, ValidationConfig, ValidationFlag,
    ValidationResult,
};

use super::{decision_exit_code, load_validation_config, print_json, read_document};

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Metric set file (JSON or YAML)
    pub file: PathBuf,

    /// Validation config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Every evaluated rule plus the resulting verdict.
#[derive(Debug, Serialize)]
pub struct MetricsOutput {
    pub flags: Vec<ValidationFlag>,
    pub result: ValidationResult,
}

pub fn check_metrics(metrics: &NumericMetricSet, config: &ValidationConfig) -> MetricsOutput {
    match MathValidator::new(config.math.clone()).validate(metrics) {
        Ok(report) => {
            let issues = QualityScorer::issues_from_flags(&report.flags);
            MetricsOutput {
                result: QualityScorer::new(config.high_issue_block_threshold).score(issues),
                flags: report.flags,
            }
        }
        Err(e) => MetricsOutput {
            flags: Vec::new(),
            result: QualityScorer::fail_closed("math", &e.to_string()),
        },
    }
}

pub fn handle_metrics(args: MetricsArgs) -> Result<i32> {
    let config = load_validation_config(args.config.as_deref())?;
    let metrics: NumericMetricSet =
        serde_json::from_value(read_document(&args.file)?).context("Invalid metric set")?;

    let output = check_metrics(&metrics, &config);
    print_json(&output)?;
    Ok(decision_exit_code(output.result.decision))
}
