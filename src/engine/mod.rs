//! Health Engine: scoring, trend and risk for one equipment over one window
//!
//! - `profile`: effective metric profiles and the central score curve
//! - `soh`: weighted state-of-health score and confidence
//! - `trend`: recent vs baseline comparison per metric
//! - `risk`: risk level and ordered maintenance suggestions
//!
//! [`HealthEngine`] bundles the four behind one immutable value built from
//! [`EngineConfig`]. It holds no mutable state and is cheap to clone, so one
//! instance serves every request and every rayon worker.

pub mod profile;
pub mod risk;
pub mod soh;
pub mod trend;

use std::collections::BTreeMap;

use statrs::statistics::Statistics;

pub use profile::{central_score, ProfileEntry, ProfileTable, Region};
pub use risk::{RiskAssessment, RiskClassifier};
pub use soh::{SamplesByMetric, SohCalculator, SohResult, WeightMap};
pub use trend::TrendAnalyzer;

use crate::config::EngineConfig;
use crate::types::{MetricSample, MetricType, TimeWindow, TrendAssessment};

/// Descriptive statistics over the finite values of a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Non-finite values dropped before computing
    pub discarded: usize,
}

impl SampleStats {
    /// `None` when no finite value remains.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if valid.is_empty() {
            return None;
        }
        let std_dev = if valid.len() > 1 {
            valid.iter().population_std_dev()
        } else {
            0.0
        };
        Some(Self {
            count: valid.len(),
            mean: valid.iter().mean(),
            std_dev,
            discarded: values.len() - valid.len(),
        })
    }
}

/// Scoring + trend result for one equipment, before risk and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentAssessment {
    /// Contributions carry the per-metric trend direction
    pub soh: SohResult,
    pub trends: BTreeMap<MetricType, TrendAssessment>,
}

/// Immutable facade over calculator, analyzer and classifier.
#[derive(Debug, Clone)]
pub struct HealthEngine {
    soh: SohCalculator,
    trend: TrendAnalyzer,
    risk: RiskClassifier,
}

impl HealthEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let profiles = ProfileTable::from_overrides(&config.profiles);
        Self {
            soh: SohCalculator::new(profiles.clone(), config.scoring.clone()),
            trend: TrendAnalyzer::new(
                profiles,
                config.trend.clone(),
                config.scoring.transition_fraction,
            ),
            risk: RiskClassifier::new(config.risk.clone()),
        }
    }

    pub fn profiles(&self) -> &ProfileTable {
        self.soh.profiles()
    }

    pub fn soh(&self) -> &SohCalculator {
        &self.soh
    }

    pub fn trend(&self) -> &TrendAnalyzer {
        &self.trend
    }

    pub fn risk(&self) -> &RiskClassifier {
        &self.risk
    }

    /// Score the window's samples and attach per-metric trends.
    ///
    /// Samples outside the window are ignored. The trailing
    /// `recent_fraction` of the window is compared to the rest.
    pub fn assess(
        &self,
        window: &TimeWindow,
        samples: &[MetricSample],
        weights: Option<&WeightMap>,
    ) -> EquipmentAssessment {
        let cutoff = window.recent_cutoff(self.trend.config().recent_fraction);
        let mut all = SamplesByMetric::new();
        let mut recent = SamplesByMetric::new();
        let mut baseline = SamplesByMetric::new();
        for s in samples.iter().filter(|s| window.contains(s.timestamp)) {
            all.entry(s.metric_type).or_default().push(s.value);
            let side = if s.timestamp >= cutoff { &mut recent } else { &mut baseline };
            side.entry(s.metric_type).or_default().push(s.value);
        }

        let mut soh = self.soh.calculate_soh(&all, weights);
        let mut trends = BTreeMap::new();
        for (metric, contribution) in &mut soh.contributions {
            let assessment = self.trend.analyze_trend(
                *metric,
                recent.get(metric).map_or(&[][..], Vec::as_slice),
                baseline.get(metric).map_or(&[][..], Vec::as_slice),
            );
            *contribution = contribution.with_trend(assessment.direction);
            trends.insert(*metric, assessment);
        }

        EquipmentAssessment { soh, trends }
    }
}

/// Group samples by metric type, keeping values only.
pub fn group_samples(samples: &[MetricSample]) -> SamplesByMetric {
    let mut grouped = SamplesByMetric::new();
    for s in samples {
        grouped.entry(s.metric_type).or_default().push(s.value);
    }
    grouped
}
