//! Gate 1: Planning
//!
//! A plan needs a target, a research type, focus areas, success metrics and
//! a duration estimate before any data is gathered.

use crate::config::GateThresholds;

use super::stage_data::{is_filled, PlanningData};
use super::{Checklist, GateId, QualityGate};

pub struct PlanningGate {
    threshold: f64,
}

impl PlanningGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
        }
    }
}

impl Default for PlanningGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

fn has_entries(values: &[String]) -> bool {
    values.iter().any(|v| !v.trim().is_empty())
}

impl QualityGate for PlanningGate {
    type Data = PlanningData;

    fn gate_id(&self) -> GateId {
        GateId::Planning
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, plan: &PlanningData) -> Checklist {
        let mut checklist = Checklist::new();

        let has_target = is_filled(&plan.target);
        checklist.check(
            "target_identified",
            has_target,
            has_target as u8 as f64,
            || "No research target identified".to_string(),
            || "Name the company, product or market being researched".to_string(),
        );

        let has_type = is_filled(&plan.research_type);
        checklist.check(
            "research_type_set",
            has_type,
            has_type as u8 as f64,
            || "Research type is missing".to_string(),
            || "Tag the plan with a research type (e.g. competitive, market, product)".to_string(),
        );

        let focus_count = plan.focus_areas.iter().filter(|f| !f.trim().is_empty()).count();
        checklist.check(
            "focus_areas_defined",
            has_entries(&plan.focus_areas),
            focus_count as f64,
            || "No focus areas defined".to_string(),
            || "List the focus areas the research must cover".to_string(),
        );

        let metric_count = plan
            .success_metrics
            .iter()
            .filter(|m| !m.trim().is_empty())
            .count();
        checklist.check(
            "success_metrics_defined",
            has_entries(&plan.success_metrics),
            metric_count as f64,
            || "No success metrics defined".to_string(),
            || "State how the research outcome will be judged".to_string(),
        );

        let has_duration = is_filled(&plan.duration_estimate);
        checklist.check(
            "duration_estimated",
            has_duration,
            has_duration as u8 as f64,
            || "Duration estimate is missing".to_string(),
            || "Estimate how long the research will take".to_string(),
        );

        checklist
    }
}
