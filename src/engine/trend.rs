//! Trend analysis: recent window vs baseline window
//!
//! Direction is judged by central score, not raw value, so a move toward the
//! optimal range is Improving on either side of `ideal`.

use tracing::debug;

use super::profile::{central_score, ProfileTable};
use super::SampleStats;
use crate::config::TrendConfig;
use crate::types::{MetricType, StabilityNote, TrendAssessment, TrendDirection};

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    profiles: ProfileTable,
    config: TrendConfig,
    transition_fraction: f64,
}

impl TrendAnalyzer {
    pub fn new(profiles: ProfileTable, config: TrendConfig, transition_fraction: f64) -> Self {
        Self {
            profiles,
            config,
            transition_fraction,
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Compare the recent window to the baseline window for one metric.
    ///
    /// Never fails: an empty recent window or a baseline with fewer than
    /// `min_baseline_samples` valid samples yields `Stable`.
    pub fn analyze_trend(&self, metric: MetricType, recent: &[f64], baseline: &[f64]) -> TrendAssessment {
        let profile = self.profiles.get(metric);
        let width = profile.optimal.width();
        let recent_stats = SampleStats::from_values(recent);
        let baseline_stats = SampleStats::from_values(baseline);

        let stability = recent_stats
            .as_ref()
            .map_or(StabilityNote::Steady, |s| self.stability(s.std_dev / width));

        let mut assessment = TrendAssessment {
            direction: TrendDirection::Stable,
            stability,
            recent_mean: recent_stats.as_ref().map(|s| s.mean),
            baseline_mean: baseline_stats.as_ref().map(|s| s.mean),
            relative_change: 0.0,
        };

        let (Some(recent_stats), Some(baseline_stats)) = (recent_stats, baseline_stats) else {
            return assessment;
        };
        assessment.relative_change = (recent_stats.mean - baseline_stats.mean) / width;
        if baseline_stats.count < self.config.min_baseline_samples {
            debug!(
                metric = %metric,
                baseline = baseline_stats.count,
                "Baseline too small for a directional trend"
            );
            return assessment;
        }
        if assessment.relative_change.abs() < self.config.tolerance {
            return assessment;
        }

        let recent_score = central_score(profile, recent_stats.mean, self.transition_fraction);
        let baseline_score = central_score(profile, baseline_stats.mean, self.transition_fraction);
        assessment.direction = if recent_score > baseline_score {
            TrendDirection::Improving
        } else if recent_score < baseline_score {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };
        assessment
    }

    fn stability(&self, rel: f64) -> StabilityNote {
        if !rel.is_finite() || rel < self.config.steady_below {
            StabilityNote::Steady
        } else if rel < self.config.erratic_above {
            StabilityNote::Fluctuating
        } else {
            StabilityNote::Erratic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::TRANSITION_FRACTION;

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(ProfileTable::default(), TrendConfig::default(), TRANSITION_FRACTION)
    }

    #[test]
    fn rising_temperature_past_optimal_is_declining() {
        let t = analyzer().analyze_trend(MetricType::Temperature, &[68.0, 69.0, 70.0], &[45.0, 46.0, 44.0, 45.0]);
        assert_eq!(t.direction, TrendDirection::Declining);
        assert!(t.relative_change > 0.0);
    }

    #[test]
    fn returning_toward_ideal_is_improving() {
        let t = analyzer().analyze_trend(MetricType::Pressure, &[0.62, 0.6, 0.61], &[0.9, 0.92, 0.88]);
        assert_eq!(t.direction, TrendDirection::Improving);
        assert!(t.relative_change < 0.0);
    }

    #[test]
    fn small_change_is_stable() {
        // 0.5 over a 40-wide band is 1.25%
        let t = analyzer().analyze_trend(MetricType::Temperature, &[40.5, 40.5], &[40.0, 40.0, 40.0]);
        assert_eq!(t.direction, TrendDirection::Stable);
    }

    #[test]
    fn short_baseline_is_stable() {
        let t = analyzer().analyze_trend(MetricType::Temperature, &[75.0, 76.0], &[40.0, 41.0]);
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(t.baseline_mean, Some(40.5));
    }

    #[test]
    fn empty_recent_window_is_stable() {
        let t = analyzer().analyze_trend(MetricType::Flow, &[], &[75.0, 76.0, 77.0]);
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(t.recent_mean, None);
        assert_eq!(t.stability, StabilityNote::Steady);
    }

    #[test]
    fn stability_notes() {
        let a = analyzer();
        let steady = a.analyze_trend(MetricType::Current, &[25.0, 25.5, 24.5], &[]);
        assert_eq!(steady.stability, StabilityNote::Steady);
        // std 5 over width 30 ≈ 0.167
        let fluct = a.analyze_trend(MetricType::Current, &[20.0, 30.0], &[]);
        assert_eq!(fluct.stability, StabilityNote::Fluctuating);
        let erratic = a.analyze_trend(MetricType::Current, &[5.0, 45.0], &[]);
        assert_eq!(erratic.stability, StabilityNote::Erratic);
    }

    #[test]
    fn deterministic() {
        let a = analyzer();
        let recent = [3.1, 3.4, 3.9];
        let baseline = [1.0, 1.1, 1.2, 0.9];
        assert_eq!(
            a.analyze_trend(MetricType::Vibration, &recent, &baseline),
            a.analyze_trend(MetricType::Vibration, &recent, &baseline)
        );
    }
}
