//! Gate 7: Final Quality Assurance
//!
//! Five reviewer sub-scores combined by weight. Stricter threshold than the
//! other gates.

use crate::config::{GateThresholds, QaWeights};

use super::stage_data::QaScores;
use super::{Checklist, GateId, QualityGate, ScoringStrategy};

pub struct FinalQaGate {
    threshold: f64,
    weights: QaWeights,
}

impl FinalQaGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.final_threshold,
            weights: thresholds.qa_weights.clone(),
        }
    }

    fn recommendation(name: &str) -> &'static str {
        match name {
            "citation_quality" => "Tie every claim to a specific fact citation",
            "insight_density" => "Replace descriptive passages with insights and their implications",
            "readability" => "Shorten sentences and break up long paragraphs",
            "actionability" => "Make each recommendation concrete: who does what, by when",
            _ => "Remove hedging and informal language",
        }
    }
}

impl Default for FinalQaGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

impl QualityGate for FinalQaGate {
    type Data = QaScores;

    fn gate_id(&self) -> GateId {
        GateId::QualityAssurance
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn scoring(&self) -> ScoringStrategy {
        ScoringStrategy::WeightedSum(vec![
            ("citation_quality".to_string(), self.weights.citation_quality),
            ("insight_density".to_string(), self.weights.insight_density),
            ("readability".to_string(), self.weights.readability),
            ("actionability".to_string(), self.weights.actionability),
            ("professional_tone".to_string(), self.weights.professional_tone),
        ])
    }

    fn evaluate(&self, scores: &QaScores) -> Checklist {
        let mut checklist = Checklist::new();

        let sub_scores = [
            ("citation_quality", scores.citation_quality),
            ("insight_density", scores.insight_density),
            ("readability", scores.readability),
            ("actionability", scores.actionability),
            ("professional_tone", scores.professional_tone),
        ];

        for (name, raw) in sub_scores {
            let valid = raw.is_finite() && (0.0..=100.0).contains(&raw);
            let value = if valid { raw } else { 0.0 };
            checklist.check(
                name,
                valid && value >= self.threshold,
                value,
                || {
                    if valid {
                        format!("{} scored {:.1} (target {})", name, value, self.threshold)
                    } else {
                        format!("{} score {} is not in [0, 100]", name, raw)
                    }
                },
                || Self::recommendation(name).to_string(),
            );
        }

        checklist
    }
}
