//! Mathematical (rules-based) validation of numeric metrics.
//!
//! Runs before any narrative check. A RED flag short-circuits the pipeline.

mod metrics;
mod validator;

pub use metrics::NumericMetricSet;
pub use validator::{MathError, MathReport, MathValidator};
