//! Gate 5: Analysis
//!
//! Insights must be dense enough relative to the facts, each backed by
//! several facts, and mostly spell out what they imply.

use std::collections::BTreeSet;

use crate::config::GateThresholds;

use super::stage_data::{is_filled, AnalysisData};
use super::{percent, share, Checklist, GateId, QualityGate};

pub struct AnalysisGate {
    threshold: f64,
    facts_per_insight: usize,
    min_supporting_facts: usize,
    min_implication_share: f64,
    min_patterns: usize,
}

impl AnalysisGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
            facts_per_insight: thresholds.facts_per_insight.max(1),
            min_supporting_facts: thresholds.min_supporting_facts,
            min_implication_share: thresholds.min_implication_share,
            min_patterns: thresholds.min_patterns,
        }
    }

    /// Insights needed for `fact_count` facts at the configured ratio.
    fn insights_needed(&self, fact_count: usize) -> usize {
        fact_count.div_ceil(self.facts_per_insight).max(1)
    }
}

impl Default for AnalysisGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

impl QualityGate for AnalysisGate {
    type Data = AnalysisData;

    fn gate_id(&self) -> GateId {
        GateId::Analysis
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, analysis: &AnalysisData) -> Checklist {
        let mut checklist = Checklist::new();
        let insights = &analysis.insights;

        let needed = self.insights_needed(analysis.fact_count);
        let missing = needed.saturating_sub(insights.len());
        checklist.check(
            "insight_density",
            missing == 0,
            insights.len() as f64,
            || {
                format!(
                    "{} insights for {} facts (need at least 1 per {})",
                    insights.len(),
                    analysis.fact_count,
                    self.facts_per_insight
                )
            },
            || format!("Derive {} more insights from the verified facts", missing),
        );

        let weak: Vec<usize> = insights
            .iter()
            .enumerate()
            .filter(|(_, insight)| {
                let distinct: BTreeSet<u32> = insight.supporting_facts.iter().copied().collect();
                distinct.len() < self.min_supporting_facts
            })
            .map(|(i, _)| i + 1)
            .collect();
        checklist.check(
            "insights_supported",
            !insights.is_empty() && weak.is_empty(),
            (insights.len() - weak.len()) as f64,
            || {
                if insights.is_empty() {
                    "No insights to check for support".to_string()
                } else {
                    format!(
                        "{} insights cite fewer than {} facts",
                        weak.len(),
                        self.min_supporting_facts
                    )
                }
            },
            || {
                let numbers: Vec<String> = weak.iter().map(|n| n.to_string()).collect();
                if numbers.is_empty() {
                    format!(
                        "Back every insight with at least {} supporting facts",
                        self.min_supporting_facts
                    )
                } else {
                    format!(
                        "Back insights {} with at least {} supporting facts each",
                        numbers.join(", "),
                        self.min_supporting_facts
                    )
                }
            },
        );

        let with_implication = insights.iter().filter(|i| is_filled(&i.implication)).count();
        let implication_share = share(with_implication, insights.len());
        checklist.check(
            "implications_stated",
            implication_share >= self.min_implication_share,
            implication_share,
            || {
                format!(
                    "{} of insights state an implication (minimum {})",
                    percent(implication_share),
                    percent(self.min_implication_share)
                )
            },
            || "State the \"so what\" for each insight".to_string(),
        );

        let patterns = analysis
            .patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .count();
        let missing_patterns = self.min_patterns.saturating_sub(patterns);
        checklist.check(
            "patterns_identified",
            missing_patterns == 0,
            patterns as f64,
            || format!("{} cross-cutting patterns (minimum {})", patterns, self.min_patterns),
            || format!("Identify {} more patterns that span several insights", missing_patterns),
        );

        checklist
    }
}
