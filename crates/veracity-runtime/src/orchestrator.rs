//! Pipeline orchestrator.
//!
//! Drives one [`PipelineRun`] through the seven stages in order:
//! - Executes each stage through the injected [`StageExecutor`]
//! - Validates the output against the stage's gate
//! - On failure, hands the data and recommendations to the [`Corrector`]
//!   and retries, at most `max_retries` attempts per gate
//! - Fails the run when a gate never passes
//!
//! Gate evaluation is deterministic. Only the collaborators may be slow or
//! non-deterministic, and those calls are the only await points.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use veracity_core::{
    Artifact, ArtifactValidator, GateId, GateResult, GateSummary, ValidationResult,
};

use crate::collaborators::{CollaboratorError, Corrector, StageExecutor, StageInputs};
use crate::config::OrchestratorConfig;
use crate::metrics::{MetricsRecord, MetricsSink};
use crate::run::{PipelineRun, PipelineState};

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{gate_id} failed after {attempts} attempts (score {:.1})", .result.score)]
    RetriesExhausted {
        gate_id: GateId,
        attempts: u32,
        result: Box<GateResult>,
    },

    #[error("{gate_id}: {source}")]
    Collaborator {
        gate_id: GateId,
        #[source]
        source: CollaboratorError,
    },

    #[error("Run {0} is already {1:?}")]
    Terminal(Uuid, PipelineState),

    #[error("Orchestrator not configured: {0}")]
    NotConfigured(String),
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    executor: Arc<dyn StageExecutor>,
    corrector: Arc<dyn Corrector>,
    sinks: Vec<Arc<dyn MetricsSink>>,
    artifact_validator: ArtifactValidator,
}

impl Orchestrator {
    /// Create an orchestrator. A `max_retries` of 0 is treated as 1.
    pub fn new(
        config: OrchestratorConfig,
        executor: Arc<dyn StageExecutor>,
        corrector: Arc<dyn Corrector>,
    ) -> Self {
        let artifact_validator = ArtifactValidator::new(config.validation_mode, &config.validation);
        Self {
            config,
            executor,
            corrector,
            sinks: Vec::new(),
            artifact_validator,
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Register a metrics sink.
    pub fn add_metrics_sink(&mut self, sink: Arc<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn max_retries(&self) -> u32 {
        self.config.max_retries.max(1)
    }

    /// Start a new run for a research request.
    pub fn start(&self, request: serde_json::Value) -> PipelineRun {
        let run = PipelineRun::new(request);
        tracing::info!(run_id = %run.run_id(), "Pipeline run started");
        run
    }

    /// Drive a run until it completes or fails.
    pub async fn run(&self, run: &mut PipelineRun) -> Result<GateSummary, PipelineError> {
        while !run.state().is_terminal() {
            self.step(run).await?;
        }

        if run.state() == PipelineState::Failed {
            return Err(PipelineError::Terminal(run.run_id(), run.state()));
        }

        let summary = run.summary();
        tracing::info!(
            run_id = %run.run_id(),
            average_score = summary.average_score,
            minimum_score = summary.minimum_score,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    /// Run the current stage until its gate passes or retries run out.
    ///
    /// Returns the passing result. The run has then moved to the next state.
    pub async fn step(&self, run: &mut PipelineRun) -> Result<GateResult, PipelineError> {
        let gate_id = run
            .state()
            .gate()
            .ok_or(PipelineError::Terminal(run.run_id(), run.state()))?;
        let max_retries = self.max_retries();

        tracing::info!(run_id = %run.run_id(), stage = ?gate_id, "Stage started");

        let mut inputs = StageInputs {
            run_id: run.run_id(),
            stage: gate_id,
            attempt: 1,
            request: run.request().clone(),
            upstream: run.outputs().clone(),
            revision: None,
            recommendations: Vec::new(),
        };

        loop {
            let data = match self.executor.execute(&inputs).await {
                Ok(data) => data,
                Err(source) => return Err(self.collaborator_failed(run, gate_id, source)),
            };

            let result = veracity_core::validate_gate(gate_id, &data, &self.config.validation);
            let attempt = run.record_attempt(gate_id, result.clone());
            self.emit(run.run_id(), gate_id, attempt, &result);

            if result.passed() {
                tracing::info!(
                    run_id = %run.run_id(),
                    stage = ?gate_id,
                    attempt,
                    score = result.score,
                    "Gate passed"
                );
                run.advance(gate_id, data);
                return Ok(result);
            }

            if attempt >= max_retries {
                tracing::warn!(
                    run_id = %run.run_id(),
                    stage = ?gate_id,
                    attempts = attempt,
                    score = result.score,
                    "Retries exhausted"
                );
                run.fail(format!(
                    "{} failed after {} attempts (score {:.1})",
                    gate_id, attempt, result.score
                ));
                return Err(PipelineError::RetriesExhausted {
                    gate_id,
                    attempts: attempt,
                    result: Box::new(result),
                });
            }

            tracing::warn!(
                run_id = %run.run_id(),
                stage = ?gate_id,
                attempt,
                score = result.score,
                failures = result.failures.len(),
                "Gate failed, requesting correction"
            );

            let revision = match self
                .corrector
                .revise(gate_id, data, &result.recommendations)
                .await
            {
                Ok(revision) => revision,
                Err(source) => return Err(self.collaborator_failed(run, gate_id, source)),
            };

            inputs.attempt = attempt + 1;
            inputs.revision = Some(revision);
            inputs.recommendations = result.recommendations;
        }
    }

    /// Validate a finished artifact with the configured validation mode.
    pub fn validate_artifact(&self, artifact: &Artifact) -> ValidationResult {
        self.artifact_validator.validate(artifact)
    }

    fn collaborator_failed(
        &self,
        run: &mut PipelineRun,
        gate_id: GateId,
        source: CollaboratorError,
    ) -> PipelineError {
        tracing::warn!(run_id = %run.run_id(), stage = ?gate_id, error = %source, "Collaborator failed");
        run.fail(format!("{}: {}", gate_id, source));
        PipelineError::Collaborator { gate_id, source }
    }

    fn emit(&self, run_id: Uuid, gate_id: GateId, attempt: u32, result: &GateResult) {
        if self.sinks.is_empty() {
            return;
        }

        let record = MetricsRecord {
            run_id,
            gate_id,
            attempt,
            result: result.clone(),
            recorded_at: chrono::Utc::now(),
        };

        for sink in &self.sinks {
            // Metrics never fail a run
            if let Err(e) = sink.record(&record) {
                tracing::warn!(run_id = %run_id, stage = ?gate_id, error = %e, "Metrics sink failed");
            }
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    executor: Option<Arc<dyn StageExecutor>>,
    corrector: Option<Arc<dyn Corrector>>,
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            executor: None,
            corrector: None,
            sinks: Vec::new(),
        }
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn StageExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn corrector(mut self, corrector: Arc<dyn Corrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }

    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the orchestrator. Executor and corrector are required.
    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let executor = self
            .executor
            .ok_or_else(|| PipelineError::NotConfigured("No stage executor set".to_string()))?;
        let corrector = self
            .corrector
            .ok_or_else(|| PipelineError::NotConfigured("No corrector set".to_string()))?;

        let mut orchestrator = Orchestrator::new(self.config, executor, corrector);
        for sink in self.sinks {
            orchestrator.add_metrics_sink(sink);
        }
        Ok(orchestrator)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::PassthroughCorrector;
    use crate::metrics::InMemoryMetricsLog;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use veracity_core::{PlanningData, StageData};

    fn plan(complete: bool) -> StageData {
        StageData::Planning(PlanningData {
            target: Some("Acme".into()),
            research_type: Some("competitive".into()),
            focus_areas: vec!["pricing".into()],
            success_metrics: if complete {
                vec!["shortlist".into()]
            } else {
                Vec::new()
            },
            duration_estimate: if complete { Some("2 days".into()) } else { None },
        })
    }

    /// Returns the corrector's revision, or an incomplete plan.
    struct PlanningExecutor {
        seen: Mutex<Vec<StageInputs>>,
    }

    #[async_trait]
    impl StageExecutor for PlanningExecutor {
        async fn execute(&self, inputs: &StageInputs) -> Result<StageData, CollaboratorError> {
            self.seen.lock().push(inputs.clone());
            Ok(inputs.revision.clone().unwrap_or_else(|| plan(false)))
        }
    }

    struct FixingCorrector {
        calls: Mutex<u32>,
        fix_after: u32,
    }

    #[async_trait]
    impl Corrector for FixingCorrector {
        async fn revise(
            &self,
            _stage: GateId,
            _data: StageData,
            _recommendations: &[String],
        ) -> Result<StageData, CollaboratorError> {
            let mut calls = self.calls.lock();
            *calls += 1;
            Ok(plan(*calls >= self.fix_after))
        }
    }

    struct BrokenCorrector;

    #[async_trait]
    impl Corrector for BrokenCorrector {
        async fn revise(
            &self,
            _stage: GateId,
            _data: StageData,
            _recommendations: &[String],
        ) -> Result<StageData, CollaboratorError> {
            Err(CollaboratorError::Correction("model unavailable".into()))
        }
    }

    fn executor() -> Arc<PlanningExecutor> {
        Arc::new(PlanningExecutor {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_retry_cap_is_exact() {
        let log = Arc::new(InMemoryMetricsLog::new());
        let orchestrator = Orchestrator::builder()
            .executor(executor())
            .corrector(Arc::new(PassthroughCorrector))
            .metrics_sink(log.clone())
            .build()
            .unwrap();

        let mut run = orchestrator.start(serde_json::Value::Null);
        let err = orchestrator.step(&mut run).await.unwrap_err();

        match err {
            PipelineError::RetriesExhausted {
                gate_id,
                attempts,
                result,
            } => {
                assert_eq!(gate_id, GateId::Planning);
                assert_eq!(attempts, 3);
                assert!(!result.passed());
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(run.state(), PipelineState::Failed);
        assert_eq!(run.attempts(GateId::Planning).len(), 3);
        assert_eq!(log.for_run(run.run_id()).len(), 3);
    }

    #[tokio::test]
    async fn test_corrected_data_passes_on_retry() {
        let exec = executor();
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            exec.clone(),
            Arc::new(FixingCorrector {
                calls: Mutex::new(0),
                fix_after: 1,
            }),
        );

        let mut run = orchestrator.start(serde_json::json!({"target": "Acme"}));
        let result = orchestrator.step(&mut run).await.unwrap();

        assert!(result.passed());
        assert_eq!(run.state(), PipelineState::DataGathering);
        assert_eq!(run.retry_count(GateId::Planning), 1);

        let seen = exec.seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].revision.is_none());
        assert_eq!(seen[1].attempt, 2);
        assert!(seen[1].revision.is_some());
        assert!(!seen[1].recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_custom_retry_count() {
        let config = OrchestratorConfig {
            max_retries: 5,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            executor(),
            Arc::new(FixingCorrector {
                calls: Mutex::new(0),
                fix_after: 4,
            }),
        );

        let mut run = orchestrator.start(serde_json::Value::Null);
        orchestrator.step(&mut run).await.unwrap();
        assert_eq!(run.attempts(GateId::Planning).len(), 5);
    }

    #[tokio::test]
    async fn test_corrector_error_fails_run() {
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            executor(),
            Arc::new(BrokenCorrector),
        );

        let mut run = orchestrator.start(serde_json::Value::Null);
        let err = orchestrator.step(&mut run).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Collaborator {
                gate_id: GateId::Planning,
                source: CollaboratorError::Correction(_)
            }
        ));
        assert_eq!(run.state(), PipelineState::Failed);
        assert_eq!(run.attempts(GateId::Planning).len(), 1);
    }

    #[tokio::test]
    async fn test_step_on_terminal_run() {
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            executor(),
            Arc::new(PassthroughCorrector),
        );

        let mut run = orchestrator.start(serde_json::Value::Null);
        run.abort("cancelled");
        let err = orchestrator.step(&mut run).await.unwrap_err();
        assert!(matches!(err, PipelineError::Terminal(_, PipelineState::Failed)));
        assert!(run.attempts(GateId::Planning).is_empty());
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = Orchestrator::builder()
            .corrector(Arc::new(PassthroughCorrector))
            .build();
        assert!(matches!(err, Err(PipelineError::NotConfigured(_))));
    }
}
