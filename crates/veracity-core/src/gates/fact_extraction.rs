//! Gate 3: Fact Extraction

use std::collections::BTreeSet;

use crate::config::GateThresholds;

use super::stage_data::ExtractedFacts;
use super::{Checklist, GateId, QualityGate};

pub struct FactExtractionGate {
    threshold: f64,
    min_facts: usize,
    min_categories: usize,
    min_high_relevance: usize,
    relevance_cutoff: u8,
}

impl FactExtractionGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
            min_facts: thresholds.min_facts,
            min_categories: thresholds.min_categories,
            min_high_relevance: thresholds.min_high_relevance,
            relevance_cutoff: thresholds.relevance_cutoff,
        }
    }
}

impl Default for FactExtractionGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

impl QualityGate for FactExtractionGate {
    type Data = ExtractedFacts;

    fn gate_id(&self) -> GateId {
        GateId::FactExtraction
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, extracted: &ExtractedFacts) -> Checklist {
        let mut checklist = Checklist::new();
        let facts = &extracted.facts;

        let count = facts.len();
        let missing = self.min_facts.saturating_sub(count);
        checklist.check(
            "min_fact_count",
            missing == 0,
            count as f64,
            || format!("Only {} facts extracted (minimum {})", count, self.min_facts),
            || format!("Extract {} more facts from the gathered sources", missing),
        );

        let incomplete: Vec<String> = facts
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_complete())
            .map(|(i, f)| match f.id {
                Some(id) => format!("#{}", id),
                None => format!("entry {}", i + 1),
            })
            .collect();
        checklist.check(
            "facts_complete",
            !facts.is_empty() && incomplete.is_empty(),
            (count - incomplete.len()) as f64,
            || {
                if facts.is_empty() {
                    "No facts to check for completeness".to_string()
                } else {
                    format!("{} incomplete facts: {}", incomplete.len(), incomplete.join(", "))
                }
            },
            || "Give every fact an id, category, claim, source reference and confidence".to_string(),
        );

        let categories: BTreeSet<String> = facts
            .iter()
            .filter_map(|f| f.category.as_deref())
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let missing_categories = self.min_categories.saturating_sub(categories.len());
        checklist.check(
            "category_coverage",
            missing_categories == 0,
            categories.len() as f64,
            || {
                format!(
                    "Facts span {} categories (minimum {})",
                    categories.len(),
                    self.min_categories
                )
            },
            || format!("Extract facts covering {} more categories", missing_categories),
        );

        let relevant = facts
            .iter()
            .filter(|f| f.relevance.map(|r| r >= self.relevance_cutoff).unwrap_or(false))
            .count();
        let missing_relevant = self.min_high_relevance.saturating_sub(relevant);
        checklist.check(
            "high_relevance_facts",
            missing_relevant == 0,
            relevant as f64,
            || {
                format!(
                    "{} facts with relevance >= {} (minimum {})",
                    relevant, self.relevance_cutoff, self.min_high_relevance
                )
            },
            || {
                format!(
                    "Find {} more facts directly relevant to the focus areas",
                    missing_relevant
                )
            },
        );

        checklist
    }
}
