//! Numeric business metrics consumed by the Mathematical Validator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial record of campaign metrics.
///
/// Every field is optional; rules that need an absent field are skipped.
/// Rates (`ctr`, `cvr`, `bounce_rate`, extra `percentages`) are expressed in
/// percent, not fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericMetricSet {
    pub impressions: Option<f64>,
    pub clicks: Option<f64>,
    pub conversions: Option<f64>,

    /// Click-through rate, percent
    pub ctr: Option<f64>,

    /// Conversion rate, percent
    #[serde(alias = "conversion_rate")]
    pub cvr: Option<f64>,

    pub spend: Option<f64>,
    pub revenue: Option<f64>,

    /// Cost per click
    pub cpc: Option<f64>,

    /// Return on ad spend (revenue / spend)
    pub roas: Option<f64>,

    pub bounce_rate: Option<f64>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    /// Any other percentage-valued fields, by name
    pub percentages: BTreeMap<String, f64>,
}

impl NumericMetricSet {
    /// All numeric fields that are present, by name.
    pub fn present_values(&self) -> Vec<(&str, f64)> {
        let named = [
            ("impressions", self.impressions),
            ("clicks", self.clicks),
            ("conversions", self.conversions),
            ("ctr", self.ctr),
            ("cvr", self.cvr),
            ("spend", self.spend),
            ("revenue", self.revenue),
            ("cpc", self.cpc),
            ("roas", self.roas),
            ("bounce_rate", self.bounce_rate),
        ];

        named
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .chain(self.percentages.iter().map(|(k, v)| (k.as_str(), *v)))
            .collect()
    }

    /// True if no field at all is set.
    pub fn is_empty(&self) -> bool {
        self.present_values().is_empty() && self.start_date.is_none() && self.end_date.is_none()
    }
}
