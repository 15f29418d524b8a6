//! Gate 4: Verification

use crate::config::GateThresholds;
use crate::types::Confidence;

use super::stage_data::VerificationData;
use super::{percent, share, Checklist, GateId, QualityGate};

pub struct VerificationGate {
    threshold: f64,
    min_high_share: f64,
    max_low_share: f64,
}

impl VerificationGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
            min_high_share: thresholds.min_high_confidence_share,
            max_low_share: thresholds.max_low_confidence_share,
        }
    }
}

impl Default for VerificationGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

impl QualityGate for VerificationGate {
    type Data = VerificationData;

    fn gate_id(&self) -> GateId {
        GateId::Verification
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, data: &VerificationData) -> Checklist {
        let mut checklist = Checklist::new();
        let total = data.facts.len();

        let high = data
            .facts
            .iter()
            .filter(|f| f.confidence == Confidence::High)
            .count();
        let high_share = share(high, total);
        checklist.check(
            "high_confidence_share",
            high_share >= self.min_high_share,
            high_share,
            || {
                format!(
                    "{} of facts are HIGH confidence (minimum {})",
                    percent(high_share),
                    percent(self.min_high_share)
                )
            },
            || "Corroborate more facts with a second independent source".to_string(),
        );

        let low = data
            .facts
            .iter()
            .filter(|f| f.confidence == Confidence::Low)
            .count();
        let low_share = share(low, total);
        checklist.check(
            "low_confidence_share",
            low_share <= self.max_low_share,
            low_share,
            || {
                format!(
                    "{} of facts are LOW confidence (maximum {})",
                    percent(low_share),
                    percent(self.max_low_share)
                )
            },
            || format!("Verify or drop {} LOW confidence facts", low),
        );

        let unresolved: Vec<&str> = data
            .conflicts
            .iter()
            .filter(|c| !c.is_resolved())
            .map(|c| c.description.as_str())
            .collect();
        checklist.check(
            "conflicts_resolved",
            unresolved.is_empty(),
            (data.conflicts.len() - unresolved.len()) as f64,
            || format!("{} source conflicts lack a resolution", unresolved.len()),
            || {
                format!(
                    "Document how each conflict was resolved: {}",
                    unresolved.join("; ")
                )
            },
        );

        let missing_credibility: Vec<u32> = data
            .facts
            .iter()
            .filter(|f| !f.credibility.map(f64::is_finite).unwrap_or(false))
            .map(|f| f.id)
            .collect();
        checklist.check(
            "credibility_scored",
            missing_credibility.is_empty(),
            (total - missing_credibility.len()) as f64,
            || format!("{} facts have no credibility score", missing_credibility.len()),
            || {
                let ids: Vec<String> = missing_credibility.iter().map(|id| format!("#{}", id)).collect();
                format!("Assign a credibility score to facts {}", ids.join(", "))
            },
        );

        checklist
    }
}
