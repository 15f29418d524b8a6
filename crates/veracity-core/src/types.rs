//! Shared types: severities, decisions, flags, issues and facts.
//!
//! These are the leaf types every other module speaks. Nothing in here
//! evaluates anything; it only describes verdicts.

use serde::{Deserialize, Serialize};

/// Severity of a Mathematical Validator flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagSeverity {
    /// Rule evaluated and satisfied
    Green,
    /// Unusual but not impossible
    Amber,
    /// Impossible or inconsistent
    Red,
}

/// Severity of a validation issue.
///
/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// Quantitative statement without a supporting citation
    Fabrication,
    /// Qualitative factual claim without a citation
    MissingCitation,
    /// Citation pointing at a fact that does not exist
    InvalidReference,
    /// Stated aggregate contradicts the underlying data
    DataIntegrity,
    /// Derived rate or cost does not match its inputs
    StatisticalInvalid,
    /// Two sections assert mutually exclusive claims
    Contradiction,
    /// Required content is missing
    Completeness,
    /// Conclusion not supported by cited facts
    Interpretation,
}

/// Final verdict governing whether an artifact may be shown to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Warn,
    Block,
}

impl Decision {
    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block)
    }

    pub fn is_warn(&self) -> bool {
        matches!(self, Decision::Warn)
    }

    pub fn is_approve(&self) -> bool {
        matches!(self, Decision::Approve)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Decision::Approve => "APPROVE",
            Decision::Warn => "WARN",
            Decision::Block => "BLOCK",
        };
        f.write_str(label)
    }
}

/// Which math rule produced a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathRule {
    NonNegative,
    FunnelMonotonicity,
    PercentageBounds,
    RateConsistency,
    CostConsistency,
    Plausibility,
    DateOrdering,
}

/// A single finding of the Mathematical Validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFlag {
    pub severity: FlagSeverity,

    /// Rule category that produced this flag
    pub rule: MathRule,

    /// Metric field the flag is about (e.g. "ctr")
    pub field: String,

    /// What is wrong (or what was checked, for GREEN flags)
    pub issue: String,

    pub expected: String,
    pub actual: String,
    pub recommendation: String,
}

impl ValidationFlag {
    pub fn is_red(&self) -> bool {
        self.severity == FlagSeverity::Red
    }

    pub fn is_amber(&self) -> bool {
        self.severity == FlagSeverity::Amber
    }
}

/// A single detected problem, produced by either validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    pub description: String,

    /// Pointer to where the problem is (e.g. "narrative[120:188]", "metrics.ctr")
    pub location: String,

    /// The offending text or values
    pub evidence: String,

    pub recommendation: String,
}

/// The single externally visible verdict for an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub decision: Decision,
    pub issues: Vec<ValidationIssue>,

    /// Human-readable one-liner for the consumer
    pub summary: String,
}

impl ValidationResult {
    /// Count issues of exactly the given severity.
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issues of a given type.
    pub fn issues_of(&self, issue_type: IssueType) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.issue_type == issue_type)
    }
}

/// Confidence attached to a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// An atomic, numbered claim: the only legitimate basis for narrative claims.
///
/// Ids are 1-based and contiguous within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: u32,
    pub category: String,
    pub claim: String,
    pub source_ref: String,
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_severity_ordering() {
        assert!(IssueSeverity::Low < IssueSeverity::Medium);
        assert!(IssueSeverity::Medium < IssueSeverity::High);
        assert!(IssueSeverity::High < IssueSeverity::Critical);
    }

    #[test]
    fn test_decision_serializes_uppercase() {
        let json = serde_json::to_string(&Decision::Block).unwrap();
        assert_eq!(json, "\"BLOCK\"");
        assert_eq!(Decision::Warn.to_string(), "WARN");
    }

    #[test]
    fn test_issue_type_field_renamed() {
        let issue = ValidationIssue {
            severity: IssueSeverity::High,
            issue_type: IssueType::MissingCitation,
            description: "d".to_string(),
            location: "narrative[0:1]".to_string(),
            evidence: "e".to_string(),
            recommendation: "r".to_string(),
        };
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["type"], "MISSING_CITATION");
        assert_eq!(value["severity"], "HIGH");
    }
}
