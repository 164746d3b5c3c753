//! Equipment status history, alarm status, and time windows

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating status reported by the equipment registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Running,
    Maintenance,
    Stopped,
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Maintenance => write!(f, "MAINTENANCE"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// A period during which the equipment held one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSpan {
    pub status: EquipmentStatus,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Lifecycle status of an alarm raised by the threshold pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Resolved,
}

/// Half-open report window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending now and spanning the given number of hours.
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self::new(end - Duration::hours(hours), end)
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Instant splitting the window so that the trailing `fraction` of it is "recent".
    pub fn recent_cutoff(&self, fraction: f64) -> DateTime<Utc> {
        let total_ms = self.duration().num_milliseconds();
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let recent_ms = (total_ms as f64 * fraction.clamp(0.0, 1.0)).round() as i64;
        self.end - Duration::milliseconds(recent_ms)
    }
}
