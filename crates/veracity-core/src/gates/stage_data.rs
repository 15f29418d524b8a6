//! Typed stage data, one shape per pipeline stage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Confidence;

use super::GateId;

/// Output of one pipeline stage, tagged by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageData {
    Planning(PlanningData),
    DataGathering(SourceCollection),
    FactExtraction(ExtractedFacts),
    Verification(VerificationData),
    Analysis(AnalysisData),
    BriefGeneration(BriefData),
    QualityAssurance(QaScores),
}

impl StageData {
    /// The stage this data belongs to.
    pub fn gate_id(&self) -> GateId {
        match self {
            StageData::Planning(_) => GateId::Planning,
            StageData::DataGathering(_) => GateId::DataGathering,
            StageData::FactExtraction(_) => GateId::FactExtraction,
            StageData::Verification(_) => GateId::Verification,
            StageData::Analysis(_) => GateId::Analysis,
            StageData::BriefGeneration(_) => GateId::BriefGeneration,
            StageData::QualityAssurance(_) => GateId::QualityAssurance,
        }
    }

    /// Deserialize an untagged payload as the data of a known stage.
    pub fn from_value(gate_id: GateId, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let data = match gate_id {
            GateId::Planning => StageData::Planning(serde_json::from_value(value)?),
            GateId::DataGathering => StageData::DataGathering(serde_json::from_value(value)?),
            GateId::FactExtraction => StageData::FactExtraction(serde_json::from_value(value)?),
            GateId::Verification => StageData::Verification(serde_json::from_value(value)?),
            GateId::Analysis => StageData::Analysis(serde_json::from_value(value)?),
            GateId::BriefGeneration => StageData::BriefGeneration(serde_json::from_value(value)?),
            GateId::QualityAssurance => StageData::QualityAssurance(serde_json::from_value(value)?),
        };
        Ok(data)
    }
}

/// Stage 1: research plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningData {
    /// Company, product or market under study
    pub target: Option<String>,
    pub research_type: Option<String>,
    pub focus_areas: Vec<String>,
    pub success_metrics: Vec<String>,
    pub duration_estimate: Option<String>,
}

/// Stage 2: gathered sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCollection {
    /// Reference date for freshness
    pub as_of: NaiveDate,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub published: Option<NaiveDate>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Published by the subject itself
    Official,
    /// Independent reviewer or analyst
    ThirdParty,
    News,
    Academic,
    Industry,
    Social,
    Review,
    #[default]
    Other,
}

/// Stage 3: facts as extracted, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFacts {
    pub facts: Vec<ExtractedFact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFact {
    pub id: Option<u32>,
    pub category: Option<String>,
    pub claim: Option<String>,
    pub source_ref: Option<String>,
    pub confidence: Option<Confidence>,

    /// Relevance on a 0-10 scale
    pub relevance: Option<u8>,
}

impl ExtractedFact {
    /// Every required field present and non-blank.
    pub fn is_complete(&self) -> bool {
        self.id.is_some()
            && self.confidence.is_some()
            && is_filled(&self.category)
            && is_filled(&self.claim)
            && is_filled(&self.source_ref)
    }
}

/// Stage 4: confidence and credibility assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationData {
    pub facts: Vec<VerifiedFact>,
    pub conflicts: Vec<SourceConflict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedFact {
    pub id: u32,
    pub confidence: Confidence,
    #[serde(default)]
    pub credibility: Option<f64>,
}

/// Two or more sources disagreeing about a fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConflict {
    pub description: String,
    pub fact_ids: Vec<u32>,
    pub resolution: Option<String>,
}

impl SourceConflict {
    pub fn is_resolved(&self) -> bool {
        is_filled(&self.resolution)
    }
}

/// Stage 5: insights derived from verified facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisData {
    /// Number of verified facts the analysis drew from
    pub fact_count: usize,
    pub insights: Vec<Insight>,

    /// Cross-cutting patterns
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    pub statement: String,
    pub supporting_facts: Vec<u32>,

    /// The "so what"
    pub implication: Option<String>,
}

/// Stage 6: the generated brief, as markdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefData {
    pub text: String,
}

/// Stage 7: reviewer sub-scores on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaScores {
    pub citation_quality: f64,
    pub insight_density: f64,
    pub readability: f64,
    pub actionability: f64,
    pub professional_tone: f64,
}

pub(crate) fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_roundtrip_through_json() {
        let data = StageData::BriefGeneration(BriefData {
            text: "# Title".to_string(),
        });
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["stage"], "BRIEF_GENERATION");
        assert_eq!(serde_json::from_value::<StageData>(value).unwrap(), data);
    }

    #[test]
    fn test_from_value_uses_stage() {
        let value = json!({
            "as_of": "2025-06-01",
            "sources": [{"url": "https://example.com", "kind": "official"}]
        });
        let data = StageData::from_value(GateId::DataGathering, value).unwrap();
        assert_eq!(data.gate_id(), GateId::DataGathering);

        let StageData::DataGathering(collection) = data else {
            panic!("wrong variant");
        };
        assert_eq!(collection.sources[0].kind, SourceKind::Official);
        assert!(collection.sources[0].published.is_none());
    }

    #[test]
    fn test_from_value_rejects_bad_shape() {
        let value = json!({"sources": "not a list"});
        assert!(StageData::from_value(GateId::DataGathering, value).is_err());
    }

    #[test]
    fn test_fact_completeness() {
        let mut fact = ExtractedFact {
            id: Some(1),
            category: Some("pricing".into()),
            claim: Some("Plan costs $20".into()),
            source_ref: Some("https://example.com/pricing".into()),
            confidence: Some(Confidence::High),
            relevance: None,
        };
        assert!(fact.is_complete());

        fact.source_ref = Some("   ".into());
        assert!(!fact.is_complete());
    }

    #[test]
    fn test_conflict_resolution() {
        let mut conflict = SourceConflict::default();
        assert!(!conflict.is_resolved());
        conflict.resolution = Some("Preferred the audited figure".into());
        assert!(conflict.is_resolved());
    }
}
