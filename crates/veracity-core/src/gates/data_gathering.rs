//! Gate 2: Data Gathering
//!
//! Enough unique sources, of enough kinds, mostly fresh, with at least one
//! official and one independent voice.

use std::collections::BTreeSet;

use crate::config::GateThresholds;

use super::stage_data::{Source, SourceCollection, SourceKind};
use super::{percent, share, Checklist, GateId, QualityGate};

/// Canonical form of a source URL for de-duplication.
///
/// Trimmed, lower-cased, without scheme or trailing slash.
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    without_scheme.trim_end_matches('/').to_string()
}

pub struct DataGatheringGate {
    threshold: f64,
    min_sources: usize,
    min_source_types: usize,
    min_fresh_share: f64,
    freshness_days: i64,
}

impl DataGatheringGate {
    pub fn new(thresholds: &GateThresholds) -> Self {
        Self {
            threshold: thresholds.pass_threshold,
            min_sources: thresholds.min_sources,
            min_source_types: thresholds.min_source_types,
            min_fresh_share: thresholds.min_fresh_share,
            freshness_days: thresholds.freshness_days,
        }
    }

    /// First occurrence of each normalized URL, in input order.
    fn unique_sources<'a>(&self, sources: &'a [Source]) -> Vec<&'a Source> {
        let mut seen = BTreeSet::new();
        sources
            .iter()
            .filter(|s| !s.url.trim().is_empty())
            .filter(|s| seen.insert(normalize_url(&s.url)))
            .collect()
    }
}

impl Default for DataGatheringGate {
    fn default() -> Self {
        Self::new(&GateThresholds::default())
    }
}

impl QualityGate for DataGatheringGate {
    type Data = SourceCollection;

    fn gate_id(&self) -> GateId {
        GateId::DataGathering
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn evaluate(&self, collection: &SourceCollection) -> Checklist {
        let mut checklist = Checklist::new();
        let unique = self.unique_sources(&collection.sources);

        let count = unique.len();
        let missing = self.min_sources.saturating_sub(count);
        checklist.check(
            "min_unique_sources",
            missing == 0,
            count as f64,
            || {
                format!(
                    "Only {} unique sources (minimum {})",
                    count, self.min_sources
                )
            },
            || {
                format!(
                    "Gather {} more unique sources (have {}, need {})",
                    missing, count, self.min_sources
                )
            },
        );

        let kinds: BTreeSet<SourceKind> = unique.iter().map(|s| s.kind).collect();
        let missing_kinds = self.min_source_types.saturating_sub(kinds.len());
        checklist.check(
            "source_type_diversity",
            missing_kinds == 0,
            kinds.len() as f64,
            || {
                format!(
                    "Only {} source types (minimum {})",
                    kinds.len(),
                    self.min_source_types
                )
            },
            || {
                format!(
                    "Add sources of {} more types (e.g. news, academic, industry reports)",
                    missing_kinds
                )
            },
        );

        let fresh = unique
            .iter()
            .filter(|s| {
                // Dates after `as_of` are treated as bad data, not as fresh
                s.published
                    .map(|date| {
                        (0..=self.freshness_days).contains(&(collection.as_of - date).num_days())
                    })
                    .unwrap_or(false)
            })
            .count();
        let fresh_share = share(fresh, count);
        checklist.check(
            "source_freshness",
            fresh_share >= self.min_fresh_share,
            fresh_share,
            || {
                format!(
                    "{} of sources are newer than {} days (minimum {})",
                    percent(fresh_share),
                    self.freshness_days,
                    percent(self.min_fresh_share)
                )
            },
            || {
                format!(
                    "Replace stale or undated sources with ones published in the last {} days",
                    self.freshness_days
                )
            },
        );

        let has_official = kinds.contains(&SourceKind::Official);
        checklist.check(
            "official_source_present",
            has_official,
            has_official as u8 as f64,
            || "No official source".to_string(),
            || "Add at least one official source (company site, filing or press release)".to_string(),
        );

        let has_third_party = kinds.contains(&SourceKind::ThirdParty);
        checklist.check(
            "third_party_source_present",
            has_third_party,
            has_third_party as u8 as f64,
            || "No independent third-party source".to_string(),
            || "Add at least one independent third-party source (analyst, reviewer)".to_string(),
        );

        checklist
    }
}
