use chrono::Utc;
use honey_quality::monitoring::{
    AggregateStats, AlertEvaluator, AlertKind, AlertThresholds, ResourceSnapshot,
};
use honey_quality::workflows::quality::{
    score_record, ClassificationScheme, ComplianceStatus, QualityCategory, Rule, RulePreset,
    RuleSet, SampleRecord, Tier,
};

fn record(moisture: f64, ph: f64, diastase: f64, hmf: f64) -> SampleRecord {
    SampleRecord::new("B-1", "S-1")
        .with_measurement("moisture", moisture)
        .with_measurement("ph", ph)
        .with_measurement("diastase_activity", diastase)
        .with_measurement("h_m_f", hmf)
}

#[test]
fn every_score_maps_to_exactly_one_label_pair() {
    for scheme in [ClassificationScheme::etl(), ClassificationScheme::unified()] {
        let mut previous = scheme.classify(0.0);
        for step in 0..=1000 {
            let score = step as f64 / 10.0;
            let (category, compliance) = scheme.classify(score);
            // Labels never get worse as the score rises.
            assert!(category <= previous.0, "category regressed at {score}");
            assert!(compliance <= previous.1, "compliance regressed at {score}");
            previous = (category, compliance);
        }
    }
}

#[test]
fn category_floors_are_inclusive() {
    let unified = ClassificationScheme::unified();
    for (floor, category) in [
        (95.0, QualityCategory::Premium),
        (90.0, QualityCategory::Excellent),
        (80.0, QualityCategory::Good),
        (70.0, QualityCategory::Fair),
    ] {
        assert_eq!(unified.category(floor), category);
    }
    assert_eq!(unified.compliance_status(80.0), ComplianceStatus::Compliant);
    assert_eq!(unified.compliance_status(70.0), ComplianceStatus::Warning);
    assert_eq!(unified.compliance_status(69.99), ComplianceStatus::NonCompliant);
}

#[test]
fn scores_stay_within_bounds_across_a_grid() {
    for preset in [RulePreset::Etl, RulePreset::Unified] {
        let rules = RuleSet::preset(preset);
        for moisture in [0.0, 10.0, 15.0, 17.5, 20.0, 22.0, 40.0] {
            for ph in [1.0, 3.5, 5.0, 6.5, 9.0] {
                for diastase in [0.0, 6.0, 8.0, 30.0] {
                    for hmf in [0.0, 40.0, 50.0, 200.0] {
                        let card = score_record(&record(moisture, ph, diastase, hmf), &rules)
                            .expect("all parameters present");
                        assert!((0.0..=100.0).contains(&card.score));
                    }
                }
            }
        }
    }
}

#[test]
fn worked_example_scores_ninety_five() {
    let moisture = Rule::range(
        "moisture",
        15.0,
        20.0,
        vec![Tier::new(1.0, 0.0), Tier::new(2.0, 5.0), Tier::catch_all(15.0)],
    )
    .expect("valid rule");
    let mut rules: Vec<Rule> = RuleSet::preset(RulePreset::Etl)
        .iter()
        .filter(|rule| rule.parameter() != "moisture")
        .cloned()
        .collect();
    rules.push(moisture);
    let rules = RuleSet::new(rules).expect("unique rules");

    let card = score_record(&record(22.0, 5.0, 12.0, 20.0), &rules).expect("scores");
    assert_eq!(card.score, 95.0);
    assert_eq!(
        ClassificationScheme::etl().classify(card.score),
        (QualityCategory::Excellent, ComplianceStatus::Compliant)
    );
}

#[test]
fn alert_fires_only_strictly_above_threshold() {
    let thresholds = AlertThresholds::default();
    let stats = AggregateStats::default();
    let evaluate = |cpu: f64| {
        AlertEvaluator.evaluate(
            &stats,
            &ResourceSnapshot {
                cpu_percent: Some(cpu),
                memory_percent: None,
                disk_percent: None,
            },
            &thresholds,
            Utc::now(),
        )
    };

    assert!(evaluate(80.0).is_empty());
    let events = evaluate(80.0001);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AlertKind::PerformanceDegradation);
}
