//! Rule-based consistency checks for numeric metrics.
//!
//! Every rule is evaluated independently. RED means impossible or
//! inconsistent, AMBER means unusual, GREEN means the rule ran and held.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MathConfig;
use crate::types::{FlagSeverity, MathRule, ValidationFlag};

use super::metrics::NumericMetricSet;

/// Absorbs float noise when comparing against a tolerance.
const EPSILON: f64 = 1e-9;

/// Errors that make the metric set unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Metric '{field}' is not a finite number")]
    NonFinite { field: String },
}

/// Outcome of validating one metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathReport {
    pub flags: Vec<ValidationFlag>,

    /// True when no RED flag is present
    pub passed: bool,
}

impl MathReport {
    fn from_flags(flags: Vec<ValidationFlag>) -> Self {
        let passed = !flags.iter().any(|f| f.is_red());
        Self { flags, passed }
    }

    pub fn red_flags(&self) -> impl Iterator<Item = &ValidationFlag> {
        self.flags.iter().filter(|f| f.is_red())
    }

    pub fn amber_flags(&self) -> impl Iterator<Item = &ValidationFlag> {
        self.flags.iter().filter(|f| f.is_amber())
    }

    pub fn red_count(&self) -> usize {
        self.red_flags().count()
    }

    pub fn amber_count(&self) -> usize {
        self.amber_flags().count()
    }
}

/// Pure numeric consistency checker.
pub struct MathValidator {
    config: MathConfig,
}

impl MathValidator {
    pub fn new(config: MathConfig) -> Self {
        Self { config }
    }

    /// Validate a metric set.
    ///
    /// Fails only when a present value is NaN or infinite; every other
    /// problem is reported as a flag.
    pub fn validate(&self, metrics: &NumericMetricSet) -> Result<MathReport, MathError> {
        for (field, value) in metrics.present_values() {
            if !value.is_finite() {
                return Err(MathError::NonFinite {
                    field: field.to_string(),
                });
            }
        }

        let mut flags = Vec::new();
        self.check_non_negative(metrics, &mut flags);
        self.check_funnel(metrics, &mut flags);
        self.check_percentage_bounds(metrics, &mut flags);
        self.check_rates(metrics, &mut flags);
        self.check_costs(metrics, &mut flags);
        self.check_plausibility(metrics, &mut flags);
        self.check_dates(metrics, &mut flags);

        let report = MathReport::from_flags(flags);
        tracing::debug!(
            flags = report.flags.len(),
            red = report.red_count(),
            amber = report.amber_count(),
            passed = report.passed,
            "Math validation complete"
        );
        Ok(report)
    }

    fn check_non_negative(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let fields = [
            ("impressions", m.impressions),
            ("clicks", m.clicks),
            ("conversions", m.conversions),
            ("spend", m.spend),
            ("revenue", m.revenue),
            ("cpc", m.cpc),
            ("roas", m.roas),
        ];

        for (field, value) in fields {
            let Some(value) = value else { continue };
            if value < 0.0 {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::NonNegative,
                    field,
                    format!("{} is negative", field),
                    ">= 0".to_string(),
                    fmt_num(value),
                    format!("Re-extract {} from the source system", field),
                ));
            }
        }
    }

    fn check_funnel(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let steps = [
            ("impressions", m.impressions, "clicks", m.clicks),
            ("clicks", m.clicks, "conversions", m.conversions),
        ];

        for (upper_name, upper, lower_name, lower) in steps {
            let (Some(upper), Some(lower)) = (upper, lower) else {
                continue;
            };
            if lower > upper {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::FunnelMonotonicity,
                    lower_name,
                    format!("{} exceed {}", lower_name, upper_name),
                    format!("{} <= {}", lower_name, fmt_num(upper)),
                    fmt_num(lower),
                    format!(
                        "Check that {} and {} come from the same period and source",
                        lower_name, upper_name
                    ),
                ));
            } else {
                flags.push(green(
                    MathRule::FunnelMonotonicity,
                    lower_name,
                    format!("{} <= {}", lower_name, upper_name),
                ));
            }
        }
    }

    fn check_percentage_bounds(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let named = [("ctr", m.ctr), ("cvr", m.cvr)];
        let fields = named
            .into_iter()
            .filter_map(|(name, v)| v.map(|v| (name.to_string(), v)))
            .chain(m.percentages.iter().map(|(k, v)| (k.clone(), *v)));

        for (field, value) in fields {
            if (0.0..=100.0).contains(&value) {
                flags.push(green(
                    MathRule::PercentageBounds,
                    &field,
                    format!("{} within [0, 100]", field),
                ));
            } else {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::PercentageBounds,
                    &field,
                    format!("{} is outside [0, 100]", field),
                    "0 <= value <= 100".to_string(),
                    fmt_num(value),
                    format!("Confirm {} is expressed in percent, not as a fraction or count", field),
                ));
            }
        }
    }

    fn check_rates(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let rates = [
            ("ctr", m.ctr, m.clicks, m.impressions, "clicks / impressions"),
            ("cvr", m.cvr, m.conversions, m.clicks, "conversions / clicks"),
        ];

        for (field, stated, numerator, denominator, formula) in rates {
            let (Some(stated), Some(numerator), Some(denominator)) = (stated, numerator, denominator)
            else {
                continue;
            };
            if denominator <= 0.0 {
                continue;
            }

            let calculated = numerator / denominator * 100.0;
            let difference = (stated - calculated).abs();
            if difference > self.config.rate_tolerance_pp + EPSILON {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::RateConsistency,
                    field,
                    format!(
                        "{} does not match {} (off by {:.3} pp)",
                        field, formula, difference
                    ),
                    format!("{:.2}% ± {} pp", calculated, self.config.rate_tolerance_pp),
                    format!("{:.2}%", stated),
                    format!("Recalculate {} as ({}) × 100", field, formula),
                ));
            } else {
                flags.push(green(
                    MathRule::RateConsistency,
                    field,
                    format!("{} matches {}", field, formula),
                ));
            }
        }
    }

    fn check_costs(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let ratios = [
            ("cpc", m.cpc, m.spend, m.clicks, "spend / clicks"),
            ("roas", m.roas, m.revenue, m.spend, "revenue / spend"),
        ];

        for (field, stated, numerator, denominator, formula) in ratios {
            let (Some(stated), Some(numerator), Some(denominator)) = (stated, numerator, denominator)
            else {
                continue;
            };
            if denominator <= 0.0 {
                continue;
            }

            let calculated = numerator / denominator;
            let mismatch = if calculated.abs() < EPSILON {
                stated.abs() > EPSILON
            } else {
                (stated - calculated).abs() / calculated.abs()
                    > self.config.cost_relative_tolerance + EPSILON
            };

            if mismatch {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::CostConsistency,
                    field,
                    format!("{} does not match {}", field, formula),
                    format!(
                        "{:.4} ± {:.1}%",
                        calculated,
                        self.config.cost_relative_tolerance * 100.0
                    ),
                    format!("{:.4}", stated),
                    format!("Recalculate {} as {}", field, formula),
                ));
            } else {
                flags.push(green(
                    MathRule::CostConsistency,
                    field,
                    format!("{} matches {}", field, formula),
                ));
            }
        }
    }

    fn check_plausibility(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let ceiling = self.config.plausible_rate_ceiling;

        for (field, value) in [("ctr", m.ctr), ("cvr", m.cvr)] {
            let Some(value) = value else { continue };
            // Out-of-range values are already RED under percentage bounds
            if value > ceiling && value <= 100.0 {
                flags.push(flag(
                    FlagSeverity::Amber,
                    MathRule::Plausibility,
                    field,
                    format!("{} of {:.2}% is unusually high", field, value),
                    format!("<= {}%", ceiling),
                    format!("{:.2}%", value),
                    format!("Verify {} against the raw platform export before publishing", field),
                ));
            }
        }

        if let Some(bounce) = m.bounce_rate {
            if (0.0..=100.0).contains(&bounce) {
                flags.push(green(
                    MathRule::Plausibility,
                    "bounce_rate",
                    "bounce_rate within [0, 100]".to_string(),
                ));
            } else {
                flags.push(flag(
                    FlagSeverity::Red,
                    MathRule::Plausibility,
                    "bounce_rate",
                    "bounce_rate is outside [0, 100]".to_string(),
                    "0 <= value <= 100".to_string(),
                    fmt_num(bounce),
                    "Bounce rate is a share of sessions; re-derive it from session counts"
                        .to_string(),
                ));
            }
        }
    }

    fn check_dates(&self, m: &NumericMetricSet, flags: &mut Vec<ValidationFlag>) {
        let (Some(start), Some(end)) = (m.start_date, m.end_date) else {
            return;
        };

        if end > start {
            flags.push(green(
                MathRule::DateOrdering,
                "end_date",
                "end_date after start_date".to_string(),
            ));
        } else {
            flags.push(flag(
                FlagSeverity::Red,
                MathRule::DateOrdering,
                "end_date",
                "end_date is not after start_date".to_string(),
                format!("> {}", start),
                end.to_string(),
                "Check the reporting window boundaries".to_string(),
            ));
        }
    }
}

impl Default for MathValidator {
    fn default() -> Self {
        Self::new(MathConfig::default())
    }
}

fn flag(
    severity: FlagSeverity,
    rule: MathRule,
    field: &str,
    issue: String,
    expected: String,
    actual: String,
    recommendation: String,
) -> ValidationFlag {
    ValidationFlag {
        severity,
        rule,
        field: field.to_string(),
        issue,
        expected,
        actual,
        recommendation,
    }
}

fn green(rule: MathRule, field: &str, issue: String) -> ValidationFlag {
    flag(
        FlagSeverity::Green,
        rule,
        field,
        issue,
        String::new(),
        String::new(),
        String::new(),
    )
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn baseline() -> NumericMetricSet {
        NumericMetricSet {
            impressions: Some(10_000.0),
            clicks: Some(500.0),
            conversions: Some(25.0),
            ctr: Some(5.0),
            cvr: Some(5.0),
            ..Default::default()
        }
    }

    fn validate(m: &NumericMetricSet) -> MathReport {
        MathValidator::default().validate(m).unwrap()
    }

    #[test]
    fn test_consistent_baseline_passes() {
        let report = validate(&baseline());
        assert!(report.passed);
        assert_eq!(report.red_count(), 0);
        assert_eq!(report.amber_count(), 0);
        assert!(report.flags.iter().all(|f| f.severity == FlagSeverity::Green));
    }

    #[test]
    fn test_clicks_exceeding_impressions_is_red() {
        let m = NumericMetricSet {
            impressions: Some(100.0),
            clicks: Some(150.0),
            ..Default::default()
        };
        let report = validate(&m);
        assert!(!report.passed);
        let red: Vec<_> = report.red_flags().collect();
        assert_eq!(red.len(), 1);
        assert_eq!(red[0].rule, MathRule::FunnelMonotonicity);
        assert_eq!(red[0].field, "clicks");
    }

    #[test]
    fn test_ctr_tolerance_is_inclusive_point_one() {
        let mut m = baseline();
        m.ctr = Some(5.05);
        assert!(validate(&m).passed);

        m.ctr = Some(5.1);
        assert!(validate(&m).passed);

        m.ctr = Some(5.2);
        let report = validate(&m);
        assert!(!report.passed);
        assert_eq!(report.red_flags().next().unwrap().rule, MathRule::RateConsistency);
    }

    #[test]
    fn test_cvr_mismatch_is_red() {
        let mut m = baseline();
        m.cvr = Some(8.0);
        let report = validate(&m);
        assert!(report.red_flags().any(|f| f.field == "cvr" && f.rule == MathRule::RateConsistency));
    }

    #[test]
    fn test_cpc_relative_tolerance() {
        let mut m = baseline();
        m.spend = Some(1000.0);
        m.cpc = Some(2.019);
        assert!(validate(&m).passed);

        m.cpc = Some(2.05);
        let report = validate(&m);
        assert!(report.red_flags().any(|f| f.rule == MathRule::CostConsistency));
    }

    #[test]
    fn test_roas_consistency() {
        let m = NumericMetricSet {
            spend: Some(1000.0),
            revenue: Some(4000.0),
            roas: Some(2.0),
            ..Default::default()
        };
        let report = validate(&m);
        assert!(report.red_flags().any(|f| f.field == "roas"));
    }

    #[test]
    fn test_percentage_out_of_bounds() {
        let mut m = NumericMetricSet::default();
        m.percentages.insert("open_rate".to_string(), 140.0);
        let report = validate(&m);
        assert!(report.red_flags().any(|f| f.field == "open_rate" && f.rule == MathRule::PercentageBounds));
    }

    #[test]
    fn test_high_ctr_is_amber_not_red() {
        let m = NumericMetricSet {
            impressions: Some(1000.0),
            clicks: Some(250.0),
            ctr: Some(25.0),
            ..Default::default()
        };
        let report = validate(&m);
        assert!(report.passed);
        assert_eq!(report.amber_count(), 1);
    }

    #[test]
    fn test_bounce_rate_out_of_range() {
        let m = NumericMetricSet {
            bounce_rate: Some(-3.0),
            ..Default::default()
        };
        assert!(!validate(&m).passed);
    }

    #[test]
    fn test_dates_must_be_strictly_ordered() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1);
        let m = NumericMetricSet {
            start_date: day,
            end_date: day,
            ..Default::default()
        };
        let report = validate(&m);
        assert!(report.red_flags().any(|f| f.rule == MathRule::DateOrdering));
    }

    #[test]
    fn test_negative_spend_is_red() {
        let m = NumericMetricSet {
            spend: Some(-10.0),
            ..Default::default()
        };
        assert!(validate(&m).red_flags().any(|f| f.rule == MathRule::NonNegative));
    }

    #[test]
    fn test_nan_is_an_error() {
        let m = NumericMetricSet {
            ctr: Some(f64::NAN),
            ..Default::default()
        };
        let result = MathValidator::default().validate(&m);
        assert_eq!(result, Err(MathError::NonFinite { field: "ctr".to_string() }));
    }

    #[test]
    fn test_empty_set_passes_without_flags() {
        let report = validate(&NumericMetricSet::default());
        assert!(report.passed);
        assert!(report.flags.is_empty());
    }
}
