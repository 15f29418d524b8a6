//! Gate 6: Brief Generation
//!
//! Structure and citation discipline of the generated markdown brief.

use crate::citation::patterns;
use crate::config::GateThresholds;

use super::stage_data::BriefData;
use super::{Checklist, GateId, QualityGate};

const EXECUTIVE_SUMMARY: &str = "Executive Summary";

pub struct BriefGate {
    threshold: f64,
    summary_words_min: usize,
    summary_words_max: usize,
    min_citation_ratio: f64,
    min_words: usize,
    required_sections: Vec<String>,
}

impl BriefGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
            summary_words_min: thresholds.summary_words_min,
            summary_words_max: thresholds.summary_words_max,
            min_citation_ratio: thresholds.min_citation_ratio,
            min_words: thresholds.min_brief_words,
            required_sections: thresholds.required_sections.clone(),
        }
    }
}

impl Default for BriefGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

/// Share of quantitative claims that carry a citation. Uses the same
/// sentence model as the citation validator: header lines count, and a
/// citation anywhere in a sentence covers every number in it. A brief
/// without quantitative claims has nothing to cite and scores 1.0.
pub fn citation_ratio(text: &str) -> f64 {
    let (claims, cited) = patterns::sentences(text)
        .iter()
        .fold((0usize, 0usize), |(claims, cited), sentence| {
            let n = patterns::quantities(sentence.text).len();
            let covered = if patterns::has_citation(sentence.text) { n } else { 0 };
            (claims + n, cited + covered)
        });
    if claims == 0 {
        return 1.0;
    }
    cited as f64 / claims as f64
}

impl QualityGate for BriefGate {
    type Data = BriefData;

    fn gate_id(&self) -> GateId {
        GateId::BriefGeneration
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, brief: &BriefData) -> Checklist {
        let mut checklist = Checklist::new();
        let text = brief.text.as_str();

        let summary_words = patterns::section_body(text, EXECUTIVE_SUMMARY)
            .map(patterns::word_count)
            .unwrap_or(0);
        let (min, max) = (self.summary_words_min, self.summary_words_max);
        checklist.check(
            "executive_summary_length",
            (min..=max).contains(&summary_words),
            summary_words as f64,
            || format!("Executive summary has {} words (expected {}-{})", summary_words, min, max),
            || {
                if summary_words == 0 {
                    format!("Add an Executive Summary section of {}-{} words", min, max)
                } else if summary_words < min {
                    format!("Expand the executive summary by {} words", min - summary_words)
                } else {
                    format!("Cut the executive summary by {} words", summary_words - max)
                }
            },
        );

        let ratio = citation_ratio(text);
        checklist.check(
            "citation_ratio",
            ratio >= self.min_citation_ratio,
            ratio,
            || {
                format!(
                    "Citation ratio {:.2} (minimum {:.2})",
                    ratio, self.min_citation_ratio
                )
            },
            || "Cite a fact as [Fact #N] for every number, percentage and amount".to_string(),
        );

        let missing: Vec<&str> = self
            .required_sections
            .iter()
            .map(String::as_str)
            .filter(|name| !patterns::has_section(text, name))
            .collect();
        checklist.check(
            "required_sections",
            missing.is_empty(),
            (self.required_sections.len() - missing.len()) as f64,
            || format!("Missing sections: {}", missing.join(", ")),
            || format!("Add section headers: {}", missing.join(", ")),
        );

        let words = patterns::word_count(text);
        checklist.check(
            "min_length",
            words >= self.min_words,
            words as f64,
            || format!("Brief has {} words (minimum {})", words, self.min_words),
            || format!("Expand the brief by at least {} words", self.min_words.saturating_sub(words)),
        );

        checklist
    }
}
