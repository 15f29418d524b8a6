//! Pipeline run bookkeeping.
//!
//! A [`PipelineRun`] is owned by exactly one caller for its lifetime and
//! mutated only through the orchestrator (plus [`PipelineRun::abort`]
//! between stages). Gate history is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use veracity_core::{GateId, GateResult, GateSummary, QualityScorer, StageData};

/// Where a run is. States only move forward, or to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Planning,
    DataGathering,
    FactExtraction,
    Verification,
    Analysis,
    BriefGeneration,
    QualityAssurance,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn from_gate(gate_id: GateId) -> Self {
        match gate_id {
            GateId::Planning => PipelineState::Planning,
            GateId::DataGathering => PipelineState::DataGathering,
            GateId::FactExtraction => PipelineState::FactExtraction,
            GateId::Verification => PipelineState::Verification,
            GateId::Analysis => PipelineState::Analysis,
            GateId::BriefGeneration => PipelineState::BriefGeneration,
            GateId::QualityAssurance => PipelineState::QualityAssurance,
        }
    }

    /// The gate guarding this state, if it is a stage.
    pub fn gate(&self) -> Option<GateId> {
        match self {
            PipelineState::Planning => Some(GateId::Planning),
            PipelineState::DataGathering => Some(GateId::DataGathering),
            PipelineState::FactExtraction => Some(GateId::FactExtraction),
            PipelineState::Verification => Some(GateId::Verification),
            PipelineState::Analysis => Some(GateId::Analysis),
            PipelineState::BriefGeneration => Some(GateId::BriefGeneration),
            PipelineState::QualityAssurance => Some(GateId::QualityAssurance),
            PipelineState::Complete | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }
}

/// One recorded gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateAttempt {
    pub attempt: u32,
    pub result: GateResult,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    run_id: Uuid,
    state: PipelineState,
    request: serde_json::Value,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    history: BTreeMap<GateId, Vec<GateAttempt>>,
    outputs: BTreeMap<GateId, StageData>,
    failure: Option<String>,
}

impl PipelineRun {
    pub fn new(request: serde_json::Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Planning,
            request,
            started_at: Utc::now(),
            finished_at: None,
            history: BTreeMap::new(),
            outputs: BTreeMap::new(),
            failure: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn request(&self) -> &serde_json::Value {
        &self.request
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Why the run failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Every attempt of one gate, oldest first.
    pub fn attempts(&self, gate_id: GateId) -> &[GateAttempt] {
        self.history.get(&gate_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attempts beyond the first for one gate.
    pub fn retry_count(&self, gate_id: GateId) -> u32 {
        (self.attempts(gate_id).len() as u32).saturating_sub(1)
    }

    /// Latest result per gate, in stage order.
    pub fn gate_results(&self) -> Vec<&GateResult> {
        self.history
            .values()
            .filter_map(|attempts| attempts.last())
            .map(|a| &a.result)
            .collect()
    }

    /// Outputs of every gate that passed.
    pub fn outputs(&self) -> &BTreeMap<GateId, StageData> {
        &self.outputs
    }

    pub fn output(&self, gate_id: GateId) -> Option<&StageData> {
        self.outputs.get(&gate_id)
    }

    /// Score summary over the latest result of every gate reached.
    pub fn summary(&self) -> GateSummary {
        let latest: Vec<GateResult> = self.gate_results().into_iter().cloned().collect();
        QualityScorer::summarize_gates(&latest)
    }

    /// Stop the run between stages. Returns false if it already finished.
    pub fn abort(&mut self, reason: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let reason = reason.into();
        tracing::warn!(run_id = %self.run_id, state = ?self.state, reason = %reason, "Run aborted");
        self.fail(format!("Aborted: {}", reason));
        true
    }

    /// Append an attempt and return its number.
    pub(crate) fn record_attempt(&mut self, gate_id: GateId, result: GateResult) -> u32 {
        let attempts = self.history.entry(gate_id).or_default();
        let attempt = attempts.len() as u32 + 1;
        attempts.push(GateAttempt {
            attempt,
            result,
            recorded_at: Utc::now(),
        });
        attempt
    }

    /// Keep a passing stage's output and move to the next state.
    pub(crate) fn advance(&mut self, gate_id: GateId, data: StageData) {
        self.outputs.insert(gate_id, data);
        self.state = match gate_id.next() {
            Some(next) => PipelineState::from_gate(next),
            None => {
                self.finished_at = Some(Utc::now());
                PipelineState::Complete
            }
        };
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.state = PipelineState::Failed;
        self.failure = Some(reason);
        self.finished_at = Some(Utc::now());
    }
}
