//! # veracity-core
//!
//! Deterministic quality gates and output validators for multi-stage
//! research pipelines.
//!
//! This crate answers two questions:
//! - Is this stage's output good enough to move on?
//! - May this finished artifact be shown to a user?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: Gates and validators are pure functions (config loading aside)
//! 3. **Traceable**: Every issue carries a location, evidence and a fix
//! 4. **Fail closed**: A validator that cannot run yields BLOCK, never APPROVE
//!
//! ## Example
//!
//! ```rust,ignore
//! use veracity_core::{validate_artifact, Artifact, ValidationConfig};
//!
//! let config = ValidationConfig::from_yaml_file("veracity.yaml")?;
//! let artifact: Artifact = serde_json::from_str(&json)?;
//! let result = validate_artifact(&artifact, &config);
//!
//! match result.decision {
//!     Decision::Approve => println!("OK"),
//!     Decision::Warn => println!("WARN: {}", result.summary),
//!     Decision::Block => println!("BLOCK: {} issues", result.issues.len()),
//! }
//! ```

pub mod citation;
pub mod config;
pub mod gates;
pub mod location;
pub mod math;
pub mod pipeline;
pub mod scorer;
pub mod types;

// Re-export main types at crate root
pub use citation::{CitationError, CitationValidator, NarrativeInput};
pub use config::{
    CitationConfig, ConfigError, GateThresholds, MathConfig, QaWeights, ValidationConfig,
};
pub use gates::stage_data::{
    AnalysisData, BriefData, ExtractedFact, ExtractedFacts, Insight, PlanningData, QaScores,
    Source, SourceCollection, SourceConflict, SourceKind, VerificationData, VerifiedFact,
};
pub use gates::{
    CheckOutcome, GateId, GateResult, GateStatus, QualityGate, ScoringStrategy, StageData,
};
pub use location::LocationBuilder;
pub use math::{MathError, MathReport, MathValidator, NumericMetricSet};
pub use pipeline::{Artifact, ArtifactValidator, ValidationMode};
pub use scorer::{GateScore, GateSummary, QualityScorer};
pub use types::{
    Confidence, Decision, Fact, FlagSeverity, IssueSeverity, IssueType, MathRule,
    ValidationFlag, ValidationIssue, ValidationResult,
};

/// Validate one stage's data against its gate.
///
/// This is the main entry point for gate evaluation. Data belonging to a
/// different stage yields a FAILED result with score 0.
pub fn validate_gate(gate_id: GateId, data: &StageData, config: &ValidationConfig) -> GateResult {
    gates::validate(gate_id, data, &config.gates)
}

/// Validate a finished artifact with math and citation checks.
///
/// Equivalent to `ArtifactValidator::full(config).validate(artifact)`.
pub fn validate_artifact(artifact: &Artifact, config: &ValidationConfig) -> ValidationResult {
    ArtifactValidator::full(config).validate(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_gate_uses_configured_thresholds() {
        let mut config = ValidationConfig::default();
        config.gates.pass_threshold = 100.0;

        let plan = PlanningData {
            target: Some("Acme".into()),
            research_type: Some("competitive".into()),
            focus_areas: vec!["pricing".into()],
            success_metrics: vec!["shortlist".into()],
            duration_estimate: None,
        };
        let data = StageData::Planning(plan);

        assert!(validate_gate(GateId::Planning, &data, &ValidationConfig::default()).passed());
        let strict = validate_gate(GateId::Planning, &data, &config);
        assert!(!strict.passed());
        assert_eq!(strict.threshold, 100.0);
    }

    #[test]
    fn test_validate_artifact_empty_approves() {
        let result = validate_artifact(&Artifact::default(), &ValidationConfig::default());
        assert_eq!(result.decision, Decision::Approve);
        assert!(result.issues.is_empty());
    }
}
