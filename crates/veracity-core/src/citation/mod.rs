//! Citation and fabrication validation.
//!
//! Generated narratives may only make claims the fact list supports. This
//! module finds numbers without citations, citations without facts, stated
//! aggregates that disagree with the data, and sections that contradict
//! each other.

pub mod patterns;
mod validator;

pub use validator::{CitationError, CitationValidator, NarrativeInput};
