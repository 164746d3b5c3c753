//! Health report, contributions, trend and risk types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{AlarmStatus, MetricType};

/// Direction of a metric relative to its optimal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Dispersion of the recent window relative to the metric's optimal band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StabilityNote {
    #[default]
    Steady,
    Fluctuating,
    Erratic,
}

/// Trend analysis result for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub direction: TrendDirection,
    pub stability: StabilityNote,
    /// Mean of the recent window, `None` when the window is empty
    pub recent_mean: Option<f64>,
    /// Mean of the baseline window, `None` when the window is empty
    pub baseline_mean: Option<f64>,
    /// Mean change relative to the optimal band width
    pub relative_change: f64,
}

impl Default for TrendAssessment {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Stable,
            stability: StabilityNote::Steady,
            recent_mean: None,
            baseline_mean: None,
            relative_change: 0.0,
        }
    }
}

/// Qualitative health level derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthLevel {
    /// Fixed bands: ≥90 Excellent, ≥75 Good, ≥60 Fair, else Poor.
    /// Band lower bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "EXCELLENT"),
            Self::Good => write!(f, "GOOD"),
            Self::Fair => write!(f, "FAIR"),
            Self::Poor => write!(f, "POOR"),
        }
    }
}

/// Risk classification used to drive recommended actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// One level up, saturating at `High`.
    pub const fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Single,
    Aggregate,
}

/// Per-metric share of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricContribution {
    /// Metric score 0-100
    pub score: f64,
    /// Normalized weight (all contributions of a report sum to 1.0)
    pub weight: f64,
    pub trend: TrendDirection,
    /// Valid samples that went into the score
    pub sample_count: usize,
    /// Mean of the valid samples
    pub mean: f64,
    /// Population standard deviation of the valid samples
    pub std_dev: f64,
}

impl MetricContribution {
    /// Copy of this contribution carrying the given trend.
    #[must_use]
    pub const fn with_trend(self, trend: TrendDirection) -> Self {
        Self { trend, ..self }
    }

    /// Weighted share of the composite score.
    pub fn weighted_score(&self) -> f64 {
        self.score * self.weight
    }
}

/// Time spent in each equipment status over the report window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UptimeStats {
    pub running_ratio: f64,
    pub maintenance_ratio: f64,
    pub stopped_ratio: f64,
    /// Share of the window with no status record
    pub unaccounted_ratio: f64,
    pub running_seconds: i64,
    pub maintenance_seconds: i64,
    pub stopped_seconds: i64,
    /// Number of status changes inside the window
    pub transitions: usize,
}

/// Individual equipment result inside an aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberScore {
    pub equipment_id: String,
    pub score: f64,
    pub confidence: f64,
    pub alarm_count: u64,
}

/// Persisted health report.
///
/// Immutable after creation; only `remarks` may be annotated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub id: Uuid,
    /// One id for single reports, every member for aggregate reports
    pub equipment_ids: Vec<String>,
    pub report_type: ReportType,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub score: f64,
    pub level: HealthLevel,
    pub confidence: f64,
    pub contributions: BTreeMap<MetricType, MetricContribution>,
    #[serde(default)]
    pub trends: BTreeMap<MetricType, TrendAssessment>,
    pub uptime: UptimeStats,
    pub alarm_count: u64,
    #[serde(default)]
    pub alarm_counts: BTreeMap<AlarmStatus, u64>,
    pub risk_level: RiskLevel,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberScore>,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl HealthReport {
    /// Primary equipment id (the first requested one for aggregate reports).
    pub fn primary_equipment(&self) -> &str {
        self.equipment_ids.first().map_or("", String::as_str)
    }

    pub fn covers_equipment(&self, equipment_id: &str) -> bool {
        self.equipment_ids.iter().any(|id| id == equipment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bands() {
        assert_eq!(HealthLevel::from_score(95.0), HealthLevel::Excellent);
        assert_eq!(HealthLevel::from_score(80.0), HealthLevel::Good);
        assert_eq!(HealthLevel::from_score(65.0), HealthLevel::Fair);
        assert_eq!(HealthLevel::from_score(50.0), HealthLevel::Poor);
    }

    #[test]
    fn level_lower_bounds_are_inclusive() {
        assert_eq!(HealthLevel::from_score(90.0), HealthLevel::Excellent);
        assert_eq!(HealthLevel::from_score(89.999), HealthLevel::Good);
        assert_eq!(HealthLevel::from_score(75.0), HealthLevel::Good);
        assert_eq!(HealthLevel::from_score(60.0), HealthLevel::Fair);
        assert_eq!(HealthLevel::from_score(59.999), HealthLevel::Poor);
        assert_eq!(HealthLevel::from_score(0.0), HealthLevel::Poor);
    }

    #[test]
    fn risk_escalation_saturates() {
        assert_eq!(RiskLevel::Low.escalate(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.escalate(), RiskLevel::High);
        assert_eq!(RiskLevel::High.escalate(), RiskLevel::High);
    }

    #[test]
    fn with_trend_keeps_other_fields() {
        let c = MetricContribution {
            score: 88.0,
            weight: 0.2,
            trend: TrendDirection::Stable,
            sample_count: 12,
            mean: 41.0,
            std_dev: 0.5,
        };
        let d = c.with_trend(TrendDirection::Declining);
        assert_eq!(d.trend, TrendDirection::Declining);
        assert_eq!(d.score, c.score);
        assert_eq!(d.sample_count, c.sample_count);
    }
}
