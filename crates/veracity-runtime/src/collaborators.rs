//! External collaborators: stage executors and correctors.
//!
//! The orchestrator never produces or fixes stage data itself. Both jobs are
//! delegated to injected implementations, which may be slow, I/O bound or
//! non-deterministic (e.g. LLM-backed).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use veracity_core::{GateId, StageData};

/// Errors from collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Stage execution failed: {0}")]
    Execution(String),

    #[error("Correction failed: {0}")]
    Correction(String),

    #[error("No data available for {0}")]
    MissingData(GateId),
}

/// Everything a stage executor is given for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageInputs {
    pub run_id: Uuid,
    pub stage: GateId,

    /// 1-based attempt number for this stage
    pub attempt: u32,

    /// The research request the run was started with
    pub request: serde_json::Value,

    /// Outputs of every stage that already passed its gate
    pub upstream: BTreeMap<GateId, StageData>,

    /// Corrector output from the previous failed attempt
    pub revision: Option<StageData>,

    /// Recommendations from the previous failed attempt
    pub recommendations: Vec<String>,
}

impl StageInputs {
    /// True on the first attempt of a stage.
    pub fn is_first_attempt(&self) -> bool {
        self.attempt == 1
    }
}

/// Produces the data for one stage.
///
/// Must tolerate being called again for the same stage with corrected
/// inputs.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, inputs: &StageInputs) -> Result<StageData, CollaboratorError>;
}

/// Revises failing stage data using a gate's recommendations.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn revise(
        &self,
        stage: GateId,
        data: StageData,
        recommendations: &[String],
    ) -> Result<StageData, CollaboratorError>;
}

/// Corrector that hands the data back unchanged.
///
/// Useful when the executor does its own correction from the
/// recommendations it receives.
pub struct PassthroughCorrector;

#[async_trait]
impl Corrector for PassthroughCorrector {
    async fn revise(
        &self,
        stage: GateId,
        data: StageData,
        recommendations: &[String],
    ) -> Result<StageData, CollaboratorError> {
        tracing::debug!(
            stage = ?stage,
            recommendations = recommendations.len(),
            "Passing stage data through uncorrected"
        );
        Ok(data)
    }
}

/// Executor that replays pre-recorded stage data.
///
/// Attempt `n` of a stage gets the `n`-th recorded entry. Past the end of
/// the recording it returns the corrector's revision if there is one,
/// otherwise the last entry again.
pub struct ReplayExecutor {
    script: BTreeMap<GateId, Vec<StageData>>,
}

impl ReplayExecutor {
    pub fn new(script: BTreeMap<GateId, Vec<StageData>>) -> Self {
        Self { script }
    }

    /// Build a script from a flat list of stage data, grouped by stage in
    /// the order given.
    pub fn from_entries(entries: impl IntoIterator<Item = StageData>) -> Self {
        let mut script: BTreeMap<GateId, Vec<StageData>> = BTreeMap::new();
        for entry in entries {
            script.entry(entry.gate_id()).or_default().push(entry);
        }
        Self { script }
    }
}

#[async_trait]
impl StageExecutor for ReplayExecutor {
    async fn execute(&self, inputs: &StageInputs) -> Result<StageData, CollaboratorError> {
        let recorded = self
            .script
            .get(&inputs.stage)
            .filter(|entries| !entries.is_empty())
            .ok_or(CollaboratorError::MissingData(inputs.stage))?;

        let index = inputs.attempt.saturating_sub(1) as usize;
        if let Some(entry) = recorded.get(index) {
            return Ok(entry.clone());
        }

        match (&inputs.revision, recorded.last()) {
            (Some(revision), _) => Ok(revision.clone()),
            (None, Some(last)) => Ok(last.clone()),
            (None, None) => Err(CollaboratorError::MissingData(inputs.stage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veracity_core::{BriefData, PlanningData};

    fn inputs(stage: GateId, attempt: u32, revision: Option<StageData>) -> StageInputs {
        StageInputs {
            run_id: Uuid::new_v4(),
            stage,
            attempt,
            request: serde_json::Value::Null,
            upstream: BTreeMap::new(),
            revision,
            recommendations: Vec::new(),
        }
    }

    fn brief(text: &str) -> StageData {
        StageData::BriefGeneration(BriefData {
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_replay_follows_attempts() {
        let executor = ReplayExecutor::from_entries(vec![brief("first"), brief("second")]);

        let first = executor.execute(&inputs(GateId::BriefGeneration, 1, None)).await.unwrap();
        let second = executor.execute(&inputs(GateId::BriefGeneration, 2, None)).await.unwrap();
        let third = executor.execute(&inputs(GateId::BriefGeneration, 3, None)).await.unwrap();

        assert_eq!(first, brief("first"));
        assert_eq!(second, brief("second"));
        assert_eq!(third, brief("second"));
    }

    #[tokio::test]
    async fn test_replay_prefers_revision_past_script() {
        let executor = ReplayExecutor::from_entries(vec![brief("first")]);
        let out = executor
            .execute(&inputs(GateId::BriefGeneration, 2, Some(brief("revised"))))
            .await
            .unwrap();
        assert_eq!(out, brief("revised"));
    }

    #[tokio::test]
    async fn test_replay_missing_stage() {
        let executor = ReplayExecutor::from_entries(vec![brief("only")]);
        let err = executor.execute(&inputs(GateId::Planning, 1, None)).await.unwrap_err();
        assert_eq!(err, CollaboratorError::MissingData(GateId::Planning));
    }

    #[tokio::test]
    async fn test_passthrough_corrector() {
        let data = StageData::Planning(PlanningData::default());
        let out = PassthroughCorrector
            .revise(GateId::Planning, data.clone(), &["Name the target".to_string()])
            .await
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_first_attempt() {
        assert!(inputs(GateId::Planning, 1, None).is_first_attempt());
        assert!(!inputs(GateId::Planning, 2, None).is_first_attempt());
    }
}
