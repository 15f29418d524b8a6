//! Quality Scorer
//!
//! Turns issue lists into the single APPROVE/WARN/BLOCK decision and gate
//! results into a consumer-facing summary.
//!
//! Policy, in order:
//! 1. Any CRITICAL issue → BLOCK
//! 2. HIGH issues at or above the configured threshold → BLOCK
//! 3. Any issue of MEDIUM or above → WARN
//! 4. Otherwise → APPROVE

use serde::{Deserialize, Serialize};

use crate::gates::{GateId, GateResult};
use crate::location;
use crate::types::{
    Decision, FlagSeverity, IssueSeverity, IssueType, MathRule, ValidationFlag, ValidationIssue,
    ValidationResult,
};

/// Aggregates flags and issues into a decision.
pub struct QualityScorer {
    high_issue_block_threshold: usize,
}

impl QualityScorer {
    pub fn new(high_issue_block_threshold: usize) -> Self {
        Self {
            high_issue_block_threshold: high_issue_block_threshold.max(1),
        }
    }

    /// Apply the decision policy to a list of issues.
    pub fn decide(&self, issues: &[ValidationIssue]) -> Decision {
        let critical = issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        if critical > 0 {
            return Decision::Block;
        }

        let high = issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::High)
            .count();
        if high >= self.high_issue_block_threshold {
            return Decision::Block;
        }

        if issues.iter().any(|i| i.severity >= IssueSeverity::Medium) {
            Decision::Warn
        } else {
            Decision::Approve
        }
    }

    /// Decide and wrap the issues into a result with a one-line summary.
    pub fn score(&self, issues: Vec<ValidationIssue>) -> ValidationResult {
        let decision = self.decide(&issues);
        let summary = self.summarize(decision, &issues);
        ValidationResult {
            decision,
            issues,
            summary,
        }
    }

    fn summarize(&self, decision: Decision, issues: &[ValidationIssue]) -> String {
        if issues.is_empty() {
            return "No issues found".to_string();
        }

        let count = |severity: IssueSeverity| issues.iter().filter(|i| i.severity == severity).count();
        let reason = match decision {
            Decision::Block if count(IssueSeverity::Critical) > 0 => "critical issues present",
            Decision::Block => "too many high-severity issues",
            Decision::Warn => "review recommended",
            Decision::Approve => "minor issues only",
        };

        format!(
            "{}: {} ({} critical, {} high, {} medium, {} low)",
            decision,
            reason,
            count(IssueSeverity::Critical),
            count(IssueSeverity::High),
            count(IssueSeverity::Medium),
            count(IssueSeverity::Low)
        )
    }

    /// Re-tag Mathematical Validator flags as issues.
    ///
    /// RED becomes CRITICAL, AMBER becomes MEDIUM, GREEN is dropped.
    pub fn issues_from_flags(flags: &[ValidationFlag]) -> Vec<ValidationIssue> {
        flags
            .iter()
            .filter_map(|flag| {
                let (severity, issue_type) = match flag.severity {
                    FlagSeverity::Green => return None,
                    FlagSeverity::Amber => (IssueSeverity::Medium, IssueType::Interpretation),
                    FlagSeverity::Red => match flag.rule {
                        MathRule::RateConsistency | MathRule::CostConsistency => {
                            (IssueSeverity::Critical, IssueType::StatisticalInvalid)
                        }
                        _ => (IssueSeverity::Critical, IssueType::DataIntegrity),
                    },
                };

                Some(ValidationIssue {
                    severity,
                    issue_type,
                    description: flag.issue.clone(),
                    location: location::metric(&flag.field),
                    evidence: format!("expected {}, got {}", flag.expected, flag.actual),
                    recommendation: flag.recommendation.clone(),
                })
            })
            .collect()
    }

    /// BLOCK result for a validator that could not run.
    pub fn fail_closed(component: &str, reason: &str) -> ValidationResult {
        tracing::warn!(component, reason, "Validator failed, blocking artifact");

        let issue = ValidationIssue {
            severity: IssueSeverity::Critical,
            issue_type: IssueType::DataIntegrity,
            description: format!("Validation could not complete: {}", reason),
            location: location::component(component),
            evidence: reason.to_string(),
            recommendation: "Fix the input and validate again; output is withheld until then"
                .to_string(),
        };

        ValidationResult {
            decision: Decision::Block,
            summary: format!("BLOCK: {} failed", component),
            issues: vec![issue],
        }
    }

    /// Summarize gate results for display.
    pub fn summarize_gates(results: &[GateResult]) -> GateSummary {
        let gates: Vec<GateScore> = results
            .iter()
            .map(|r| GateScore {
                gate_id: r.gate_id,
                score: r.score,
                passed: r.passed(),
            })
            .collect();

        let average_score = if gates.is_empty() {
            0.0
        } else {
            gates.iter().map(|g| g.score).sum::<f64>() / gates.len() as f64
        };
        let minimum_score = gates.iter().map(|g| g.score).fold(None, |min: Option<f64>, s| {
            Some(min.map_or(s, |m| m.min(s)))
        });

        GateSummary {
            all_passed: !gates.is_empty() && gates.iter().all(|g| g.passed),
            average_score,
            minimum_score: minimum_score.unwrap_or(0.0),
            gates,
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Per-gate score line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateScore {
    pub gate_id: GateId,
    pub score: f64,
    pub passed: bool,
}

/// Progress and quality summary across gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSummary {
    pub gates: Vec<GateScore>,
    pub average_score: f64,
    pub minimum_score: f64,
    pub all_passed: bool,
}
