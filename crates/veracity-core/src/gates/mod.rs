//! Quality Gates.
//!
//! One fixed checklist per pipeline stage. A gate scores the stage's data,
//! lists what failed and says how to fix it. Gates are pure: the same data
//! always yields the same [`GateResult`].

mod analysis;
mod brief;
mod data_gathering;
mod fact_extraction;
mod final_qa;
mod planning;
pub mod stage_data;
mod verification;

pub use analysis::AnalysisGate;
pub use brief::BriefGate;
pub use data_gathering::{normalize_url, DataGatheringGate};
pub use fact_extraction::FactExtractionGate;
pub use final_qa::FinalQaGate;
pub use planning::PlanningGate;
pub use stage_data::StageData;
pub use verification::VerificationGate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::GateThresholds;

/// The seven fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateId {
    Planning,
    DataGathering,
    FactExtraction,
    Verification,
    Analysis,
    BriefGeneration,
    QualityAssurance,
}

impl GateId {
    pub const ALL: [GateId; 7] = [
        GateId::Planning,
        GateId::DataGathering,
        GateId::FactExtraction,
        GateId::Verification,
        GateId::Analysis,
        GateId::BriefGeneration,
        GateId::QualityAssurance,
    ];

    /// 1-based stage number.
    pub fn number(&self) -> u8 {
        match self {
            GateId::Planning => 1,
            GateId::DataGathering => 2,
            GateId::FactExtraction => 3,
            GateId::Verification => 4,
            GateId::Analysis => 5,
            GateId::BriefGeneration => 6,
            GateId::QualityAssurance => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GateId::Planning => "Planning",
            GateId::DataGathering => "Data Gathering",
            GateId::FactExtraction => "Fact Extraction",
            GateId::Verification => "Verification",
            GateId::Analysis => "Analysis",
            GateId::BriefGeneration => "Brief Generation",
            GateId::QualityAssurance => "Final Quality Assurance",
        }
    }

    /// The stage after this one, or `None` for the last stage.
    pub fn next(&self) -> Option<GateId> {
        let index = self.number() as usize;
        GateId::ALL.get(index).copied()
    }

    /// Score needed to pass this gate.
    pub fn threshold(&self, thresholds: &GateThresholds) -> f64 {
        match self {
            GateId::QualityAssurance => thresholds.final_threshold,
            _ => thresholds.pass_threshold,
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gate {} ({})", self.number(), self.name())
    }
}

impl FromStr for GateId {
    type Err = String;

    /// Accepts a stage number (`2`) or name (`data-gathering`, `DATA_GATHERING`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        let id = match key.as_str() {
            "1" | "planning" => GateId::Planning,
            "2" | "data_gathering" => GateId::DataGathering,
            "3" | "fact_extraction" => GateId::FactExtraction,
            "4" | "verification" => GateId::Verification,
            "5" | "analysis" => GateId::Analysis,
            "6" | "brief_generation" | "brief" => GateId::BriefGeneration,
            "7" | "quality_assurance" | "final_qa" | "qa" => GateId::QualityAssurance,
            _ => return Err(format!("Unknown stage '{}'", s)),
        };
        Ok(id)
    }
}

/// Pass/fail verdict of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Passed,
    Failed,
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,

    /// Measured value behind the check (a count, a share, a sub-score)
    pub value: f64,
}

/// How a gate turns its check outcomes into a score in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Passed checks / total checks × 100
    UniformRatio,

    /// Σ weight × value over named checks, values already on a 0-100 scale
    WeightedSum(Vec<(String, f64)>),
}

impl ScoringStrategy {
    pub fn score(&self, outcomes: &[CheckOutcome]) -> f64 {
        match self {
            ScoringStrategy::UniformRatio => {
                if outcomes.is_empty() {
                    return 0.0;
                }
                let passed = outcomes.iter().filter(|o| o.passed).count();
                passed as f64 / outcomes.len() as f64 * 100.0
            }
            ScoringStrategy::WeightedSum(weights) => {
                let total_weight: f64 = weights.iter().map(|(_, w)| w).sum();
                if total_weight <= 0.0 {
                    return 0.0;
                }
                let weighted: f64 = weights
                    .iter()
                    .map(|(name, weight)| {
                        let value = outcomes
                            .iter()
                            .find(|o| &o.name == name)
                            .map(|o| o.value)
                            .filter(|v| v.is_finite())
                            .unwrap_or(0.0);
                        weight * value.clamp(0.0, 100.0)
                    })
                    .sum();
                (weighted / total_weight).clamp(0.0, 100.0)
            }
        }
    }
}

/// Structured verdict of one gate on one piece of stage data.
///
/// `status == Passed` exactly when `score >= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: GateId,
    pub status: GateStatus,
    pub score: f64,
    pub threshold: f64,
    pub checks: BTreeMap<String, bool>,

    /// Short diagnostics, in check order
    pub failures: Vec<String>,

    /// Imperative corrective instructions, in check order
    pub recommendations: Vec<String>,
}

impl GateResult {
    pub fn passed(&self) -> bool {
        self.status == GateStatus::Passed
    }

    fn from_checklist(
        gate_id: GateId,
        threshold: f64,
        strategy: &ScoringStrategy,
        checklist: Checklist,
    ) -> Self {
        // Rounded so weighted sums landing on the threshold are not lost to float noise
        let score = (strategy.score(&checklist.outcomes) * 1e6).round() / 1e6;
        let status = if score >= threshold {
            GateStatus::Passed
        } else {
            GateStatus::Failed
        };

        Self {
            gate_id,
            status,
            score,
            threshold,
            checks: checklist
                .outcomes
                .iter()
                .map(|o| (o.name.clone(), o.passed))
                .collect(),
            failures: checklist.failures,
            recommendations: checklist.recommendations,
        }
    }

    /// Fail-closed result for stage data of the wrong kind.
    pub fn wrong_stage(gate_id: GateId, threshold: f64, found: GateId) -> Self {
        let mut checks = BTreeMap::new();
        checks.insert("stage_data_matches".to_string(), false);

        Self {
            gate_id,
            status: GateStatus::Failed,
            score: 0.0,
            threshold,
            checks,
            failures: vec![format!(
                "{} received {} data",
                gate_id,
                found.name()
            )],
            recommendations: vec![format!("Produce {} stage data", gate_id.name())],
        }
    }
}

/// Accumulates check outcomes, failures and recommendations for one gate.
#[derive(Debug, Default)]
pub struct Checklist {
    outcomes: Vec<CheckOutcome>,
    failures: Vec<String>,
    recommendations: Vec<String>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check. On failure the diagnostic and recommendation are
    /// built and kept.
    pub fn check(
        &mut self,
        name: &str,
        passed: bool,
        value: f64,
        failure: impl FnOnce() -> String,
        recommendation: impl FnOnce() -> String,
    ) -> &mut Self {
        tracing::debug!(check = name, passed, value, "Gate check evaluated");

        if !passed {
            self.failures.push(failure());
            self.recommendations.push(recommendation());
        }
        self.outcomes.push(CheckOutcome {
            name: name.to_string(),
            passed,
            value,
        });
        self
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }
}

/// A fixed checklist for one stage.
pub trait QualityGate {
    /// The stage data this gate reads.
    type Data;

    /// Which stage this gate guards.
    fn gate_id(&self) -> GateId;

    /// Score needed to pass.
    fn threshold(&self) -> f64;

    /// How outcomes become a score.
    fn scoring(&self) -> ScoringStrategy {
        ScoringStrategy::UniformRatio
    }

    /// Run every check against the data.
    fn evaluate(&self, data: &Self::Data) -> Checklist;

    /// Evaluate and score.
    fn validate(&self, data: &Self::Data) -> GateResult {
        let checklist = self.evaluate(data);
        let result =
            GateResult::from_checklist(self.gate_id(), self.threshold(), &self.scoring(), checklist);
        tracing::debug!(
            stage = ?result.gate_id,
            score = result.score,
            passed = result.passed(),
            "Gate evaluated"
        );
        result
    }
}

/// Validate stage data against the gate for `gate_id`.
///
/// Data of the wrong kind yields a FAILED result with score 0.
pub fn validate(gate_id: GateId, data: &StageData, thresholds: &GateThresholds) -> GateResult {
    match (gate_id, data) {
        (GateId::Planning, StageData::Planning(d)) => PlanningGate::new(thresholds).validate(d),
        (GateId::DataGathering, StageData::DataGathering(d)) => {
            DataGatheringGate::new(thresholds).validate(d)
        }
        (GateId::FactExtraction, StageData::FactExtraction(d)) => {
            FactExtractionGate::new(thresholds).validate(d)
        }
        (GateId::Verification, StageData::Verification(d)) => {
            VerificationGate::new(thresholds).validate(d)
        }
        (GateId::Analysis, StageData::Analysis(d)) => AnalysisGate::new(thresholds).validate(d),
        (GateId::BriefGeneration, StageData::BriefGeneration(d)) => {
            BriefGate::new(thresholds).validate(d)
        }
        (GateId::QualityAssurance, StageData::QualityAssurance(d)) => {
            FinalQaGate::new(thresholds).validate(d)
        }
        (expected, other) => {
            tracing::warn!(
                stage = ?expected,
                found = ?other.gate_id(),
                "Stage data does not match gate"
            );
            GateResult::wrong_stage(expected, expected.threshold(thresholds), other.gate_id())
        }
    }
}

/// Share of `part` in `whole`, 0 when `whole` is 0.
pub(crate) fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

pub(crate) fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}
