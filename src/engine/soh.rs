//! State-of-health calculator
//!
//! Per-metric samples → weighted composite score (0-100), per-metric
//! contributions and a confidence figure.
//!
//! # Scoring Algorithm
//!
//! For each metric with at least one finite sample:
//! 1. Central score from the mean against the metric profile
//!    (see [`super::profile::central_score`])
//! 2. Stability penalty from the population standard deviation relative to
//!    the optimal band width. The result stays within the floor of the worst
//!    region any sample falls in and the best single-sample central score
//! 3. Weighted average over scored metrics, weights normalized to 1.0
//!
//! Confidence combines coverage of the core metric set with sample depth.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::profile::{central_score, region, ProfileTable, Region};
use super::SampleStats;
use crate::config::ScoringConfig;
use crate::types::{MetricContribution, MetricType, TrendDirection};

/// Sample values grouped by metric type.
pub type SamplesByMetric = BTreeMap<MetricType, Vec<f64>>;

/// Optional per-call weight overrides.
pub type WeightMap = BTreeMap<MetricType, f64>;

/// Output of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SohResult {
    pub score: f64,
    pub confidence: f64,
    pub contributions: BTreeMap<MetricType, MetricContribution>,
}

impl SohResult {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            contributions: BTreeMap::new(),
        }
    }
}

/// Immutable calculator over a profile table and scoring config.
#[derive(Debug, Clone)]
pub struct SohCalculator {
    profiles: ProfileTable,
    config: ScoringConfig,
}

impl SohCalculator {
    pub fn new(profiles: ProfileTable, config: ScoringConfig) -> Self {
        Self { profiles, config }
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Score a set of per-metric samples.
    ///
    /// Metrics with no finite samples are absent from the result and do not
    /// count toward coverage. Empty input yields score 0, confidence 0.
    pub fn calculate_soh(&self, samples: &SamplesByMetric, weights: Option<&WeightMap>) -> SohResult {
        let mut scored: Vec<(MetricType, f64, SampleStats)> = Vec::with_capacity(samples.len());
        for (&metric, values) in samples {
            let Some(stats) = SampleStats::from_values(values) else {
                debug!(metric = %metric, "No valid samples, metric excluded");
                continue;
            };
            if stats.discarded > 0 {
                debug!(metric = %metric, discarded = stats.discarded, "Discarded non-finite samples");
            }
            let score = self.metric_score(metric, values, &stats);
            scored.push((metric, score, stats));
        }

        if scored.is_empty() {
            return SohResult::empty();
        }

        let raw_weights: Vec<f64> = scored
            .iter()
            .map(|(metric, _, _)| self.effective_weight(*metric, weights))
            .collect();
        let total: f64 = raw_weights.iter().sum();
        let normalized: Vec<f64> = if total > 0.0 {
            raw_weights.iter().map(|w| w / total).collect()
        } else {
            #[allow(clippy::cast_precision_loss)]
            let equal = 1.0 / scored.len() as f64;
            vec![equal; scored.len()]
        };

        let mut contributions = BTreeMap::new();
        let mut composite = 0.0;
        for ((metric, score, stats), weight) in scored.iter().zip(&normalized) {
            composite += score * weight;
            contributions.insert(
                *metric,
                MetricContribution {
                    score: *score,
                    weight: *weight,
                    trend: TrendDirection::Stable,
                    sample_count: stats.count,
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                },
            );
        }

        let confidence = self.confidence(scored.iter().map(|(_, _, s)| s.count));
        let score = composite.clamp(0.0, 100.0);

        debug!(
            score = format!("{:.1}", score),
            confidence = format!("{:.3}", confidence),
            metrics = contributions.len(),
            "SOH calculated"
        );

        SohResult {
            score,
            confidence,
            contributions,
        }
    }

    /// Score of one metric from its samples and their statistics.
    ///
    /// A set never scores above its best sample or below the floor of the
    /// worst region one of its samples reaches. Non-finite values are skipped.
    pub fn metric_score(&self, metric: MetricType, values: &[f64], stats: &SampleStats) -> f64 {
        let profile = self.profiles.get(metric);
        let fraction = self.config.transition_fraction;
        let central = central_score(profile, stats.mean, fraction);
        let penalty = self.stability_penalty(stats.std_dev, profile.optimal.width());

        let mut worst = Region::Optimal;
        let mut ceiling = f64::NEG_INFINITY;
        for &v in values.iter().filter(|v| v.is_finite()) {
            worst = worst.max(region(profile, v));
            ceiling = ceiling.max(central_score(profile, v, fraction));
        }
        if !ceiling.is_finite() {
            ceiling = central;
        }
        let ceiling = ceiling.clamp(0.0, 100.0);
        let floor = worst.floor().min(central).min(ceiling);
        (central - penalty).clamp(floor, ceiling)
    }

    /// Points subtracted for dispersion relative to the optimal band.
    pub fn stability_penalty(&self, std_dev: f64, optimal_width: f64) -> f64 {
        if optimal_width <= 0.0 || !std_dev.is_finite() {
            return 0.0;
        }
        let rel = std_dev / optimal_width;
        if rel <= self.config.dispersion_dead_band {
            return 0.0;
        }
        ((rel - self.config.dispersion_dead_band) * self.config.penalty_per_band_width)
            .min(self.config.max_stability_penalty)
    }

    fn effective_weight(&self, metric: MetricType, weights: Option<&WeightMap>) -> f64 {
        let default = self.profiles.get(metric).weight;
        match weights.and_then(|w| w.get(&metric)) {
            Some(&w) if w.is_finite() && w >= 0.0 => w,
            Some(&w) => {
                warn!(metric = %metric, weight = w, "Ignoring invalid custom weight, using profile default");
                default
            }
            None => default,
        }
    }

    /// `coverage × (floor + (1 − floor) × depth)`.
    fn confidence(&self, counts: impl Iterator<Item = usize>) -> f64 {
        let saturation = (1.0 + self.config.sample_saturation.max(1) as f64).ln();
        let mut metrics = 0usize;
        let mut depth_sum = 0.0;
        for n in counts {
            metrics += 1;
            #[allow(clippy::cast_precision_loss)]
            let depth = ((1.0 + n as f64).ln() / saturation).min(1.0);
            depth_sum += depth;
        }
        if metrics == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let coverage = (metrics.min(MetricType::CORE_COUNT) as f64) / MetricType::CORE_COUNT as f64;
        #[allow(clippy::cast_precision_loss)]
        let depth = depth_sum / metrics as f64;
        let floor = self.config.coverage_floor;
        (coverage * (floor + (1.0 - floor) * depth)).clamp(0.0, 1.0)
    }
}
