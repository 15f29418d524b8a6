//! Artifact validation: math first, then citations, then one decision.
//!
//! The Mathematical Validator is cheap and runs first. Any RED flag blocks
//! the artifact immediately and the Citation Validator is never invoked.
//! Internal validator errors never escape; they become a BLOCK.

use serde::{Deserialize, Serialize};

use crate::citation::{CitationValidator, NarrativeInput};
use crate::config::ValidationConfig;
use crate::math::{MathValidator, NumericMetricSet};
use crate::scorer::QualityScorer;
use crate::types::{Fact, ValidationResult};

/// Which validators an [`ArtifactValidator`] runs. Chosen at configuration
/// time, never switched at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Math and citation validation
    #[default]
    Full,
    /// Math validation only
    MathOnly,
}

/// A finished artifact: narrative text, the facts behind it, and the
/// metrics it reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub narrative: String,
    pub facts: Vec<Fact>,
    pub metrics: NumericMetricSet,

    /// Size of the underlying dataset, for checking stated aggregates
    pub record_count: Option<u64>,
}

pub struct ArtifactValidator {
    mode: ValidationMode,
    math: MathValidator,
    citation: CitationValidator,
    scorer: QualityScorer,
}

impl ArtifactValidator {
    pub fn new(mode: ValidationMode, config: &ValidationConfig) -> Self {
        Self {
            mode,
            math: MathValidator::new(config.math.clone()),
            citation: CitationValidator::new(config.citation.clone()),
            scorer: QualityScorer::new(config.high_issue_block_threshold),
        }
    }

    pub fn full(config: &ValidationConfig) -> Self {
        Self::new(ValidationMode::Full, config)
    }

    pub fn math_only(config: &ValidationConfig) -> Self {
        Self::new(ValidationMode::MathOnly, config)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate an artifact and return the single authoritative verdict.
    pub fn validate(&self, artifact: &Artifact) -> ValidationResult {
        let report = match self.math.validate(&artifact.metrics) {
            Ok(report) => report,
            Err(e) => return QualityScorer::fail_closed("math", &e.to_string()),
        };

        let mut issues = QualityScorer::issues_from_flags(&report.flags);

        if !report.passed {
            tracing::info!(
                red = report.red_count(),
                "Math validation failed, skipping citation checks"
            );
            return self.scorer.score(issues);
        }

        if self.mode == ValidationMode::Full {
            let mut input = NarrativeInput::new(&artifact.narrative, &artifact.facts);
            if let Some(count) = artifact.record_count {
                input = input.with_record_count(count);
            }

            match self.citation.validate(&input) {
                Ok(citation_issues) => issues.extend(citation_issues),
                Err(e) => return QualityScorer::fail_closed("citation", &e.to_string()),
            }
        }

        let result = self.scorer.score(issues);
        tracing::debug!(
            mode = ?self.mode,
            decision = %result.decision,
            issues = result.issues.len(),
            "Artifact validated"
        );
        result
    }
}

impl Default for ArtifactValidator {
    fn default() -> Self {
        Self::full(&ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, Decision, IssueType};

    fn facts() -> Vec<Fact> {
        (1..=3)
            .map(|id| Fact {
                id,
                category: "performance".into(),
                claim: format!("Claim {}", id),
                source_ref: "analytics export".into(),
                confidence: Confidence::High,
            })
            .collect()
    }

    fn consistent_metrics() -> NumericMetricSet {
        NumericMetricSet {
            impressions: Some(10_000.0),
            clicks: Some(500.0),
            conversions: Some(25.0),
            ctr: Some(5.0),
            cvr: Some(5.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_artifact_approves() {
        let artifact = Artifact {
            narrative: "CTR held at 5.0% [Fact #1] while conversions reached 25 [Fact #2].".into(),
            facts: facts(),
            metrics: consistent_metrics(),
            record_count: None,
        };
        let result = ArtifactValidator::default().validate(&artifact);
        assert_eq!(result.decision, Decision::Approve);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_math_red_short_circuits() {
        let mut metrics = consistent_metrics();
        metrics.clicks = Some(20_000.0);
        let artifact = Artifact {
            // Would be an invalid reference if citations were checked
            narrative: "See [Fact #99].".into(),
            facts: facts(),
            metrics,
            record_count: None,
        };
        let result = ArtifactValidator::default().validate(&artifact);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.issues_of(IssueType::InvalidReference).count(), 0);
    }

    #[test]
    fn test_math_only_skips_citations() {
        let artifact = Artifact {
            narrative: "Revenue grew 40% last quarter.".into(),
            facts: facts(),
            metrics: consistent_metrics(),
            record_count: None,
        };
        let config = ValidationConfig::default();
        assert_eq!(ArtifactValidator::math_only(&config).validate(&artifact).decision, Decision::Approve);
        assert_eq!(ArtifactValidator::full(&config).validate(&artifact).decision, Decision::Block);
    }

    #[test]
    fn test_malformed_facts_fail_closed() {
        let mut bad = facts();
        bad[2].id = 1;
        let artifact = Artifact {
            narrative: "Nothing to see.".into(),
            facts: bad,
            metrics: NumericMetricSet::default(),
            record_count: None,
        };
        let result = ArtifactValidator::default().validate(&artifact);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.issues[0].location, "validator.citation");
    }

    #[test]
    fn test_non_finite_metric_fails_closed() {
        let mut metrics = consistent_metrics();
        metrics.spend = Some(f64::INFINITY);
        let artifact = Artifact {
            metrics,
            ..Default::default()
        };
        let result = ArtifactValidator::default().validate(&artifact);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.issues[0].location, "validator.math");
    }

    #[test]
    fn test_amber_flag_warns() {
        let artifact = Artifact {
            metrics: NumericMetricSet {
                impressions: Some(1000.0),
                clicks: Some(300.0),
                ctr: Some(30.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = ArtifactValidator::default().validate(&artifact);
        assert_eq!(result.decision, Decision::Warn);
    }
}
