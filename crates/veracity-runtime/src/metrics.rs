//! Append-only gate metrics.
//!
//! Every gate attempt of every run is emitted as one [`MetricsRecord`].
//! Sinks only append; nothing in the runtime reads them back.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use veracity_core::{GateId, GateResult};

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to write metrics: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize metrics record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One gate attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub run_id: Uuid,
    pub gate_id: GateId,
    pub attempt: u32,
    pub result: GateResult,
    pub recorded_at: DateTime<Utc>,
}

/// Destination for gate metrics.
///
/// Implementations must accept concurrent appends from independent runs
/// without losing or interleaving records.
pub trait MetricsSink: Send + Sync {
    fn record(&self, record: &MetricsRecord) -> Result<(), MetricsError>;
}

/// In-process metrics log.
#[derive(Default)]
pub struct InMemoryMetricsLog {
    records: Mutex<Vec<MetricsRecord>>,
}

impl InMemoryMetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in append order.
    pub fn records(&self) -> Vec<MetricsRecord> {
        self.records.lock().clone()
    }

    /// Records of one run, in append order.
    pub fn for_run(&self, run_id: Uuid) -> Vec<MetricsRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl MetricsSink for InMemoryMetricsLog {
    fn record(&self, record: &MetricsRecord) -> Result<(), MetricsError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, MetricsError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> MetricsSink for JsonLinesSink<W> {
    fn record(&self, record: &MetricsRecord) -> Result<(), MetricsError> {
        // Serialize outside the lock; one locked write per record
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Emits each record as a structured tracing event.
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(&self, record: &MetricsRecord) -> Result<(), MetricsError> {
        tracing::info!(
            target: "veracity::metrics",
            run_id = %record.run_id,
            stage = ?record.gate_id,
            attempt = record.attempt,
            score = record.result.score,
            passed = record.result.passed(),
            "Gate attempt recorded"
        );
        Ok(())
    }
}
