use proptest::prelude::*;
use veracity_core::{
    gates, validate_artifact, validate_gate, Artifact, Confidence, Decision, Fact, GateId,
    GateThresholds, IssueSeverity, IssueType, MathRule, MathValidator, NumericMetricSet,
    QaScores, Source, SourceCollection, SourceKind, StageData, ValidationConfig,
};

use chrono::{Duration, NaiveDate};

fn facts(n: u32) -> Vec<Fact> {
    (1..=n)
        .map(|id| Fact {
            id,
            category: "market".to_string(),
            claim: format!("Claim {}", id),
            source_ref: "report".to_string(),
            confidence: Confidence::Medium,
        })
        .collect()
}

fn source_kind() -> impl Strategy<Value = SourceKind> {
    prop_oneof![
        Just(SourceKind::Official),
        Just(SourceKind::ThirdParty),
        Just(SourceKind::News),
        Just(SourceKind::Academic),
        Just(SourceKind::Industry),
        Just(SourceKind::Other),
    ]
}

fn source() -> impl Strategy<Value = Source> {
    ("[a-z]{1,8}", source_kind(), proptest::option::of(0i64..720)).prop_map(
        |(host, kind, age)| Source {
            url: format!("https://{}.example.com", host),
            kind,
            published: age.map(|days| as_of() - Duration::days(days)),
            title: None,
        },
    )
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

proptest! {
    #[test]
    fn clicks_above_impressions_always_blocks(
        impressions in 1u32..1_000_000,
        excess in 1u32..1_000_000,
    ) {
        let metrics = NumericMetricSet {
            impressions: Some(impressions as f64),
            clicks: Some(impressions as f64 + excess as f64),
            ..Default::default()
        };

        let report = MathValidator::default().validate(&metrics).unwrap();
        prop_assert!(report
            .red_flags()
            .any(|f| f.rule == MathRule::FunnelMonotonicity && f.field == "clicks"));

        let artifact = Artifact { metrics, ..Default::default() };
        let result = validate_artifact(&artifact, &ValidationConfig::default());
        prop_assert_eq!(result.decision, Decision::Block);
    }

    #[test]
    fn consistent_metrics_never_red(
        impressions in 1u32..1_000_000,
        click_share in 0.0f64..=1.0,
        conversion_share in 0.0f64..=1.0,
        spend in 0.0f64..100_000.0,
        revenue in 0.0f64..500_000.0,
    ) {
        let impressions = impressions as f64;
        let clicks = (impressions * click_share).floor();
        let conversions = (clicks * conversion_share).floor();

        let mut metrics = NumericMetricSet {
            impressions: Some(impressions),
            clicks: Some(clicks),
            conversions: Some(conversions),
            ctr: Some(clicks / impressions * 100.0),
            spend: Some(spend),
            revenue: Some(revenue),
            ..Default::default()
        };
        if clicks > 0.0 {
            metrics.cvr = Some(conversions / clicks * 100.0);
            metrics.cpc = Some(spend / clicks);
        }
        if spend > 0.01 {
            metrics.roas = Some(revenue / spend);
        }

        let report = MathValidator::default().validate(&metrics).unwrap();
        prop_assert_eq!(report.red_count(), 0, "unexpected RED flags: {:?}", report.flags);
        prop_assert!(report.passed);
    }

    #[test]
    fn out_of_range_citation_always_blocks(
        fact_count in 1u32..40,
        overshoot in 1u32..1000,
        prefix in "[A-Za-z ,]{0,80}",
    ) {
        let cited = fact_count + overshoot;
        let narrative = format!("{}. The segment performed well [Fact #{}].", prefix, cited);
        let artifact = Artifact {
            narrative,
            facts: facts(fact_count),
            ..Default::default()
        };

        let result = validate_artifact(&artifact, &ValidationConfig::default());
        prop_assert_eq!(result.decision, Decision::Block);
        prop_assert!(result
            .issues_of(IssueType::InvalidReference)
            .any(|i| i.severity == IssueSeverity::Critical));
    }

    #[test]
    fn data_gathering_gate_is_idempotent(sources in proptest::collection::vec(source(), 0..30)) {
        let data = StageData::DataGathering(SourceCollection { as_of: as_of(), sources });
        let config = ValidationConfig::default();

        let first = validate_gate(GateId::DataGathering, &data, &config);
        let second = validate_gate(GateId::DataGathering, &data, &config);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.passed(), first.score >= first.threshold);
    }

    #[test]
    fn final_qa_score_stays_in_range(
        a in -50.0f64..150.0,
        b in -50.0f64..150.0,
        c in -50.0f64..150.0,
        d in -50.0f64..150.0,
        e in -50.0f64..150.0,
    ) {
        let data = StageData::QualityAssurance(QaScores {
            citation_quality: a,
            insight_density: b,
            readability: c,
            actionability: d,
            professional_tone: e,
        });
        let result = gates::validate(GateId::QualityAssurance, &data, &GateThresholds::default());
        prop_assert!((0.0..=100.0).contains(&result.score));
        prop_assert_eq!(result.passed(), result.score >= 85.0);
    }
}
