//! Engine Property Tests
//!
//! Scoring, confidence, trend and risk properties checked against the
//! built-in profile table, independently of any store or report.

use std::collections::BTreeMap;

use equipment_health::config::EngineConfig;
use equipment_health::engine::{HealthEngine, SamplesByMetric, WeightMap};
use equipment_health::types::{
    HealthLevel, MetricContribution, MetricType, RiskLevel, StabilityNote, TrendDirection,
};

fn engine() -> HealthEngine {
    HealthEngine::new(&EngineConfig::default())
}

/// Score of a single metric held at a constant value.
fn constant_score(engine: &HealthEngine, metric: MetricType, value: f64) -> f64 {
    let samples: SamplesByMetric = [(metric, vec![value; 10])].into_iter().collect();
    engine.soh().calculate_soh(&samples, None).score
}

/// `steps + 1` evenly spaced points in `[low, high]`.
fn sweep(low: f64, high: f64, steps: usize) -> impl Iterator<Item = f64> {
    (0..=steps).map(move |i| (low + (high - low) * i as f64 / steps as f64).min(high))
}

fn contribution(score: f64, trend: TrendDirection) -> MetricContribution {
    MetricContribution {
        score,
        weight: 1.0,
        trend,
        sample_count: 10,
        mean: 0.0,
        std_dev: 0.0,
    }
}

// ============================================================================
// Scoring bands
// ============================================================================

#[test]
fn values_inside_optimal_score_85_to_100() {
    let engine = engine();
    for metric in MetricType::ALL {
        let p = metric.default_profile();
        for value in sweep(p.optimal.low, p.optimal.high, 40) {
            let score = constant_score(&engine, metric, value);
            assert!(
                (85.0..=100.0).contains(&score),
                "{metric} at {value}: score {score} outside optimal band"
            );
        }
    }
}

#[test]
fn ideal_value_scores_100() {
    let engine = engine();
    for metric in MetricType::ALL {
        let score = constant_score(&engine, metric, metric.default_profile().ideal);
        assert!((score - 100.0).abs() < 1e-9, "{metric}: {score}");
    }
}

#[test]
fn values_in_warning_past_transition_score_40_to_70() {
    let engine = engine();
    let fraction = EngineConfig::default().scoring.transition_fraction;
    for metric in MetricType::ALL {
        let p = metric.default_profile();
        // upper side
        if !p.upper_open() {
            let span = p.warning.high - p.optimal.high;
            let from = p.optimal.high + span * (fraction + 0.01);
            for value in sweep(from, p.warning.high, 20) {
                let score = constant_score(&engine, metric, value);
                assert!(
                    (40.0..=70.0).contains(&score),
                    "{metric} at {value}: score {score} outside warning band"
                );
            }
        }
        // lower side
        if !p.lower_open() {
            let span = p.optimal.low - p.warning.low;
            let to = p.optimal.low - span * (fraction + 0.01);
            for value in sweep(p.warning.low, to, 20) {
                let score = constant_score(&engine, metric, value);
                assert!(
                    (40.0..=70.0).contains(&score),
                    "{metric} at {value}: score {score} outside warning band"
                );
            }
        }
    }
}

#[test]
fn score_is_continuous_at_optimal_edge() {
    let engine = engine();
    let p = MetricType::Temperature.default_profile();
    let at_edge = constant_score(&engine, MetricType::Temperature, p.optimal.high);
    let just_past = constant_score(&engine, MetricType::Temperature, p.optimal.high + 1e-6);
    assert!((at_edge - just_past).abs() < 0.01, "{at_edge} vs {just_past}");
}

#[test]
fn values_far_beyond_warning_score_zero() {
    let engine = engine();
    let p = MetricType::Temperature.default_profile();
    let span = p.warning.high - p.optimal.high;
    assert_eq!(constant_score(&engine, MetricType::Temperature, p.warning.high + 2.0 * span), 0.0);
    let beyond = constant_score(&engine, MetricType::Temperature, p.warning.high + 0.5 * span);
    assert!(beyond > 0.0 && beyond < 40.0, "{beyond}");
}

#[test]
fn open_side_never_leaves_optimal() {
    // Vibration has no lower warning side: 0 mm/s is ideal
    let engine = engine();
    assert!((constant_score(&engine, MetricType::Vibration, 0.0) - 100.0).abs() < 1e-9);
    assert!(constant_score(&engine, MetricType::Vibration, -1.0) >= 85.0);
}

// ============================================================================
// Composite and weights
// ============================================================================

#[test]
fn empty_input_scores_zero_with_zero_confidence() {
    let result = engine().soh().calculate_soh(&SamplesByMetric::new(), None);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.confidence, 0.0);
    assert!(result.contributions.is_empty());
}

#[test]
fn non_finite_only_metric_is_excluded() {
    let samples: SamplesByMetric = [
        (MetricType::Temperature, vec![40.0; 5]),
        (MetricType::Pressure, vec![f64::NAN, f64::INFINITY]),
    ]
    .into_iter()
    .collect();
    let result = engine().soh().calculate_soh(&samples, None);
    assert_eq!(result.contributions.len(), 1);
    assert!(!result.contributions.contains_key(&MetricType::Pressure));
}

#[test]
fn custom_weights_are_reflected_after_normalization() {
    let samples: SamplesByMetric = [
        (MetricType::Temperature, vec![40.0; 10]),
        (MetricType::Vibration, vec![5.0; 10]),
    ]
    .into_iter()
    .collect();
    let weights: WeightMap = [(MetricType::Temperature, 3.0), (MetricType::Vibration, 1.0)]
        .into_iter()
        .collect();
    let result = engine().soh().calculate_soh(&samples, Some(&weights));

    let temp = result.contributions[&MetricType::Temperature];
    let vib = result.contributions[&MetricType::Vibration];
    assert!((temp.weight - 0.75).abs() < 1e-12);
    assert!((vib.weight - 0.25).abs() < 1e-12);
    let expected = temp.score * 0.75 + vib.score * 0.25;
    assert!((result.score - expected).abs() < 1e-9);
}

#[test]
fn weights_always_sum_to_one() {
    let samples: SamplesByMetric = MetricType::ALL
        .iter()
        .map(|m| (*m, vec![m.default_profile().ideal; 3]))
        .collect();
    let result = engine().soh().calculate_soh(&samples, None);
    let sum: f64 = result.contributions.values().map(|c| c.weight).sum();
    assert!((sum - 1.0).abs() < 1e-12, "{sum}");
}

#[test]
fn invalid_custom_weight_falls_back_to_profile_default() {
    let samples: SamplesByMetric = [
        (MetricType::Temperature, vec![40.0; 10]),
        (MetricType::Vibration, vec![0.5; 10]),
    ]
    .into_iter()
    .collect();
    let weights: WeightMap = [(MetricType::Temperature, -2.0)].into_iter().collect();
    let engine = engine();
    let custom = engine.soh().calculate_soh(&samples, Some(&weights));
    let default = engine.soh().calculate_soh(&samples, None);
    assert_eq!(custom, default);
}

#[test]
fn lower_dispersion_never_scores_lower() {
    let engine = engine();
    let tight: SamplesByMetric = [(MetricType::Temperature, vec![39.0, 40.0, 41.0, 40.0])]
        .into_iter()
        .collect();
    let loose: SamplesByMetric = [(MetricType::Temperature, vec![25.0, 55.0, 25.0, 55.0])]
        .into_iter()
        .collect();
    let tight = engine.soh().calculate_soh(&tight, None).score;
    let loose = engine.soh().calculate_soh(&loose, None).score;
    assert!(tight >= loose, "tight {tight} < loose {loose}");
}

#[test]
fn samples_split_across_warning_sides_score_as_warning() {
    // every sample is in warning, the mean lands on the ideal
    let engine = engine();
    let samples: SamplesByMetric = [(MetricType::Temperature, vec![5.0, 75.0, 5.0, 75.0, 5.0, 75.0])]
        .into_iter()
        .collect();
    let score = engine.soh().calculate_soh(&samples, None).score;
    assert!((40.0..=70.0).contains(&score), "score {score}");
}

// ============================================================================
// Confidence
// ============================================================================

#[test]
fn more_samples_raise_confidence() {
    let engine = engine();
    let one: SamplesByMetric = [(MetricType::Temperature, vec![40.0])].into_iter().collect();
    let many: SamplesByMetric = [(MetricType::Temperature, vec![40.0; 50])].into_iter().collect();
    let c1 = engine.soh().calculate_soh(&one, None).confidence;
    let c50 = engine.soh().calculate_soh(&many, None).confidence;
    assert!(c1 < c50, "{c1} !< {c50}");
}

#[test]
fn full_coverage_confidence_is_at_least_floor() {
    let samples: SamplesByMetric = MetricType::ALL
        .iter()
        .map(|m| (*m, vec![m.default_profile().ideal]))
        .collect();
    let confidence = engine().soh().calculate_soh(&samples, None).confidence;
    assert!(confidence >= 0.6, "{confidence}");
    assert!(confidence <= 1.0);
}

#[test]
fn saturated_full_coverage_reaches_one() {
    let samples: SamplesByMetric = MetricType::ALL
        .iter()
        .map(|m| (*m, vec![m.default_profile().ideal; 30]))
        .collect();
    let confidence = engine().soh().calculate_soh(&samples, None).confidence;
    assert!((confidence - 1.0).abs() < 1e-9, "{confidence}");
}

// ============================================================================
// Trend
// ============================================================================

#[test]
fn drift_away_from_ideal_is_declining() {
    let a = engine();
    let t = a.trend().analyze_trend(MetricType::Temperature, &[58.0; 6], &[40.0; 6]);
    assert_eq!(t.direction, TrendDirection::Declining);
}

#[test]
fn recovery_toward_ideal_is_improving() {
    let a = engine();
    let t = a.trend().analyze_trend(MetricType::Temperature, &[42.0; 6], &[70.0; 6]);
    assert_eq!(t.direction, TrendDirection::Improving);
}

#[test]
fn short_baseline_is_stable() {
    let a = engine();
    let t = a.trend().analyze_trend(MetricType::Temperature, &[75.0; 6], &[40.0, 40.0]);
    assert_eq!(t.direction, TrendDirection::Stable);
}

#[test]
fn wide_recent_spread_is_erratic() {
    let a = engine();
    let t = a
        .trend()
        .analyze_trend(MetricType::Temperature, &[10.0, 70.0, 10.0, 70.0], &[40.0; 6]);
    assert_eq!(t.stability, StabilityNote::Erratic);
}

// ============================================================================
// Levels and risk
// ============================================================================

#[test]
fn level_bands_cover_score_range() {
    for (score, level) in [
        (100.0, HealthLevel::Excellent),
        (90.0, HealthLevel::Excellent),
        (89.9, HealthLevel::Good),
        (75.0, HealthLevel::Good),
        (74.9, HealthLevel::Fair),
        (60.0, HealthLevel::Fair),
        (59.9, HealthLevel::Poor),
        (0.0, HealthLevel::Poor),
    ] {
        assert_eq!(HealthLevel::from_score(score), level, "score {score}");
    }
}

#[test]
fn risk_base_levels_follow_score() {
    let engine = engine();
    let none = BTreeMap::new();
    assert_eq!(engine.risk().classify_risk(80.0, &none, 0).level, RiskLevel::Low);
    assert_eq!(engine.risk().classify_risk(65.0, &none, 0).level, RiskLevel::Medium);
    assert_eq!(engine.risk().classify_risk(30.0, &none, 0).level, RiskLevel::High);
}

#[test]
fn risk_escalates_once_for_any_signal() {
    let engine = engine();
    let declining: BTreeMap<_, _> =
        [(MetricType::Vibration, contribution(80.0, TrendDirection::Declining))].into_iter().collect();
    let critical: BTreeMap<_, _> =
        [(MetricType::Pressure, contribution(20.0, TrendDirection::Stable))].into_iter().collect();

    assert_eq!(engine.risk().classify_risk(80.0, &declining, 0).level, RiskLevel::Medium);
    assert_eq!(engine.risk().classify_risk(80.0, &critical, 0).level, RiskLevel::Medium);
    assert_eq!(engine.risk().classify_risk(80.0, &BTreeMap::new(), 11).level, RiskLevel::Medium);
    // several signals still escalate by one level only
    assert_eq!(engine.risk().classify_risk(80.0, &critical, 50).level, RiskLevel::Medium);
    assert_eq!(engine.risk().classify_risk(65.0, &critical, 50).level, RiskLevel::High);
}

#[test]
fn alarm_threshold_is_exclusive() {
    let engine = engine();
    assert_eq!(engine.risk().classify_risk(80.0, &BTreeMap::new(), 10).level, RiskLevel::Low);
}

#[test]
fn suggestions_follow_metric_order() {
    let engine = engine();
    let contributions: BTreeMap<_, _> = [
        (MetricType::Flow, contribution(50.0, TrendDirection::Stable)),
        (MetricType::Temperature, contribution(55.0, TrendDirection::Stable)),
        (MetricType::Voltage, contribution(95.0, TrendDirection::Stable)),
    ]
    .into_iter()
    .collect();
    let risk = engine.risk().classify_risk(70.0, &contributions, 0);
    assert!(risk.suggestions.len() >= 2);
    assert!(risk.suggestions[0].to_lowercase().contains("temperature"), "{:?}", risk.suggestions);
    assert!(risk.suggestions[1].to_lowercase().contains("flow"), "{:?}", risk.suggestions);
    assert!(!risk.suggestions.iter().any(|s| s.to_lowercase().contains("voltage")));
}

#[test]
fn healthy_equipment_gets_routine_suggestion() {
    let engine = engine();
    let contributions: BTreeMap<_, _> =
        [(MetricType::Temperature, contribution(95.0, TrendDirection::Stable))].into_iter().collect();
    let risk = engine.risk().classify_risk(95.0, &contributions, 0);
    assert_eq!(risk.level, RiskLevel::Low);
    assert_eq!(risk.suggestions.len(), 1);
    assert!(risk.suggestions[0].to_lowercase().contains("routine"));
}
