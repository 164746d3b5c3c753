//! Metric profile table and the central score curve
//!
//! The table is built once from the configuration and never changes
//! afterwards. Scoring, trend and API code all read profiles through it.

use serde::Serialize;

use crate::config::ProfileOverrides;
use crate::types::{MetricProfile, MetricType};

/// Effective profile for every metric type.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    profiles: [MetricProfile; MetricType::CORE_COUNT],
}

/// Serializable view of one table row (`GET /api/v2/profiles`).
#[derive(Debug, Clone, Serialize)]
pub struct ProfileEntry {
    pub metric: MetricType,
    #[serde(flatten)]
    pub profile: MetricProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::from_overrides(&ProfileOverrides::default())
    }
}

impl ProfileTable {
    pub fn from_overrides(overrides: &ProfileOverrides) -> Self {
        Self {
            profiles: MetricType::ALL.map(|m| overrides.resolve(m)),
        }
    }

    pub fn get(&self, metric: MetricType) -> &MetricProfile {
        // ALL is in declaration order, so the discriminant is the index
        &self.profiles[metric as usize]
    }

    pub fn entries(&self) -> Vec<ProfileEntry> {
        MetricType::ALL
            .iter()
            .map(|&metric| ProfileEntry {
                metric,
                profile: *self.get(metric),
            })
            .collect()
    }
}

/// Which scoring region a value falls into, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Region {
    Optimal,
    Warning,
    Beyond,
}

impl Region {
    /// Lowest metric score a value in this region can reach.
    pub const fn floor(self) -> f64 {
        match self {
            Self::Optimal => crate::config::defaults::SCORE_OPTIMAL_EDGE,
            Self::Warning => crate::config::defaults::SCORE_WARNING_EDGE,
            Self::Beyond => 0.0,
        }
    }
}

/// Region of `value` for this profile. Values past an open side count as optimal.
pub fn region(profile: &MetricProfile, value: f64) -> Region {
    let value = clamp_open_sides(profile, value);
    if profile.optimal.contains(value) {
        Region::Optimal
    } else if profile.warning.contains(value) {
        Region::Warning
    } else {
        Region::Beyond
    }
}

fn clamp_open_sides(profile: &MetricProfile, value: f64) -> f64 {
    if profile.lower_open() && value < profile.optimal.low {
        profile.optimal.low
    } else if profile.upper_open() && value > profile.optimal.high {
        profile.optimal.high
    } else {
        value
    }
}

/// Central score (0-100) of a mean value against a profile.
///
/// Piecewise-linear on each side of `ideal`:
/// - `ideal` = 100, optimal edge = 85
/// - first `transition_fraction` of the warning span: 85 → 70
/// - rest of the warning span: 70 → 40
/// - one further warning span beyond the warning edge: 40 → 0
pub fn central_score(profile: &MetricProfile, value: f64, transition_fraction: f64) -> f64 {
    use crate::config::defaults::{
        SCORE_IDEAL, SCORE_OPTIMAL_EDGE, SCORE_WARNING_EDGE, SCORE_WARNING_START,
    };

    let value = clamp_open_sides(profile, value);
    let (distance_in_optimal, optimal_half, past_optimal, warning_span) = if value >= profile.ideal {
        (
            value - profile.ideal,
            profile.optimal.high - profile.ideal,
            value - profile.optimal.high,
            profile.warning.high - profile.optimal.high,
        )
    } else {
        (
            profile.ideal - value,
            profile.ideal - profile.optimal.low,
            profile.optimal.low - value,
            profile.optimal.low - profile.warning.low,
        )
    };

    if past_optimal <= 0.0 {
        if optimal_half <= 0.0 {
            return SCORE_IDEAL;
        }
        let t = (distance_in_optimal / optimal_half).clamp(0.0, 1.0);
        return SCORE_IDEAL - t * (SCORE_IDEAL - SCORE_OPTIMAL_EDGE);
    }

    // Closed side with a positive warning span (open sides were clamped above)
    if warning_span <= 0.0 {
        return SCORE_OPTIMAL_EDGE;
    }

    let ramp = warning_span * transition_fraction.clamp(0.0, 1.0);
    if past_optimal <= ramp && ramp > 0.0 {
        let t = past_optimal / ramp;
        return SCORE_OPTIMAL_EDGE - t * (SCORE_OPTIMAL_EDGE - SCORE_WARNING_START);
    }
    if past_optimal <= warning_span {
        let t = (past_optimal - ramp) / (warning_span - ramp);
        return SCORE_WARNING_START - t * (SCORE_WARNING_START - SCORE_WARNING_EDGE);
    }

    let beyond = (past_optimal - warning_span) / warning_span;
    (SCORE_WARNING_EDGE * (1.0 - beyond)).max(0.0)
}
