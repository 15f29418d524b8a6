//! # veracity-runtime
//!
//! Async orchestration of research pipelines over `veracity-core` gates.
//!
//! The core crate decides whether stage data is good enough. This crate
//! decides what happens next: it calls the injected stage executor, runs the
//! gate, asks the injected corrector for a revision on failure, and retries
//! up to a fixed bound before failing the run.
//!
//! ## Important
//!
//! The orchestrator never generates or fixes data itself. Stage execution
//! and correction (often LLM-backed) are collaborators passed in by the
//! caller, which keeps every gate decision deterministic and testable with
//! fake collaborators.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use veracity_runtime::{InMemoryMetricsLog, Orchestrator, OrchestratorConfig};
//!
//! let log = Arc::new(InMemoryMetricsLog::new());
//! let orchestrator = Orchestrator::builder()
//!     .config(OrchestratorConfig::from_yaml_file("veracity.yaml")?)
//!     .executor(Arc::new(MyExecutor::new()))
//!     .corrector(Arc::new(MyLlmCorrector::new()))
//!     .metrics_sink(log.clone())
//!     .build()?;
//!
//! let mut run = orchestrator.start(serde_json::json!({"target": "Acme"}));
//! let summary = orchestrator.run(&mut run).await?;
//! println!("average gate score: {:.1}", summary.average_score);
//! ```

pub mod collaborators;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod run;

pub use collaborators::{
    CollaboratorError, Corrector, PassthroughCorrector, ReplayExecutor, StageExecutor,
    StageInputs,
};
pub use config::OrchestratorConfig;
pub use metrics::{
    InMemoryMetricsLog, JsonLinesSink, MetricsError, MetricsRecord, MetricsSink,
    TracingMetricsSink,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, PipelineError};
pub use run::{GateAttempt, PipelineRun, PipelineState};
