//! Metric types, samples, and per-metric scoring profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of monitored metric types.
///
/// Every variant is part of the expected core metric set used for confidence
/// coverage. Adding a metric means adding a variant here together with its
/// default profile in [`MetricType::default_profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Temperature,
    Vibration,
    Pressure,
    Current,
    Voltage,
    Speed,
    Flow,
}

impl MetricType {
    /// All metric types in declaration order (also the suggestion order).
    pub const ALL: [Self; 7] = [
        Self::Temperature,
        Self::Vibration,
        Self::Pressure,
        Self::Current,
        Self::Voltage,
        Self::Speed,
        Self::Flow,
    ];

    /// Size of the expected core metric set.
    pub const CORE_COUNT: usize = Self::ALL.len();

    /// Built-in profile for this metric type.
    ///
    /// | Metric      | Optimal       | Warning       | Ideal | Weight |
    /// |-------------|---------------|---------------|-------|--------|
    /// | Temperature | 20-60 °C      | 0-80 °C       | 40    | 0.20   |
    /// | Vibration   | 0-2.8 mm/s    | 0-7.1 mm/s    | 0     | 0.20   |
    /// | Pressure    | 0.4-0.8 MPa   | 0.2-1.0 MPa   | 0.6   | 0.15   |
    /// | Current     | 10-40 A       | 5-50 A        | 25    | 0.15   |
    /// | Voltage     | 370-400 V     | 350-420 V     | 385   | 0.10   |
    /// | Speed       | 1400-1500 rpm | 1200-1600 rpm | 1450  | 0.10   |
    /// | Flow        | 50-100 m³/h   | 30-120 m³/h   | 75    | 0.10   |
    ///
    /// Vibration zones follow ISO 10816-3 (zone A/B boundary at 2.8 mm/s,
    /// B/C boundary at 7.1 mm/s). Its lower side is open: 0 mm/s is ideal.
    pub const fn default_profile(self) -> MetricProfile {
        match self {
            Self::Temperature => MetricProfile::new(
                Range::new(20.0, 60.0),
                Range::new(0.0, 80.0),
                40.0,
                0.20,
                "°C",
            ),
            Self::Vibration => MetricProfile::new(
                Range::new(0.0, 2.8),
                Range::new(0.0, 7.1),
                0.0,
                0.20,
                "mm/s",
            ),
            Self::Pressure => MetricProfile::new(
                Range::new(0.4, 0.8),
                Range::new(0.2, 1.0),
                0.6,
                0.15,
                "MPa",
            ),
            Self::Current => MetricProfile::new(
                Range::new(10.0, 40.0),
                Range::new(5.0, 50.0),
                25.0,
                0.15,
                "A",
            ),
            Self::Voltage => MetricProfile::new(
                Range::new(370.0, 400.0),
                Range::new(350.0, 420.0),
                385.0,
                0.10,
                "V",
            ),
            Self::Speed => MetricProfile::new(
                Range::new(1400.0, 1500.0),
                Range::new(1200.0, 1600.0),
                1450.0,
                0.10,
                "rpm",
            ),
            Self::Flow => MetricProfile::new(
                Range::new(50.0, 100.0),
                Range::new(30.0, 120.0),
                75.0,
                0.10,
                "m³/h",
            ),
        }
    }

    /// Stable snake_case identifier (matches the serde representation).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Vibration => "vibration",
            Self::Pressure => "pressure",
            Self::Current => "current",
            Self::Voltage => "voltage",
            Self::Speed => "speed",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a metric name does not map to a known [`MetricType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric type '{0}'")]
pub struct UnknownMetricType(pub String);

impl FromStr for MetricType {
    type Err = UnknownMetricType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Self::Temperature),
            "vibration" | "vib" => Ok(Self::Vibration),
            "pressure" => Ok(Self::Pressure),
            "current" => Ok(Self::Current),
            "voltage" => Ok(Self::Voltage),
            "speed" | "rpm" => Ok(Self::Speed),
            "flow" => Ok(Self::Flow),
            _ => Err(UnknownMetricType(s.to_string())),
        }
    }
}

/// Closed numeric interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// True when `other` lies entirely within this range.
    pub fn encloses(&self, other: &Self) -> bool {
        self.low <= other.low && self.high >= other.high
    }
}

/// Scoring profile for one metric type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricProfile {
    /// Values in this range score 85-100
    pub optimal: Range,
    /// Values in this range (outside optimal) score 40-70
    pub warning: Range,
    /// Value inside the optimal range that scores exactly 100
    pub ideal: f64,
    /// Default weight before normalization
    pub weight: f64,
    /// Display unit
    pub unit: &'static str,
}

impl MetricProfile {
    pub const fn new(optimal: Range, warning: Range, ideal: f64, weight: f64, unit: &'static str) -> Self {
        Self {
            optimal,
            warning,
            ideal,
            weight,
            unit,
        }
    }

    /// Lower side is open when the warning and optimal ranges share the lower bound.
    pub fn lower_open(&self) -> bool {
        self.warning.low >= self.optimal.low
    }

    /// Upper side is open when the warning and optimal ranges share the upper bound.
    pub fn upper_open(&self) -> bool {
        self.warning.high <= self.optimal.high
    }

    /// Structural problems with this profile, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let values = [
            self.optimal.low,
            self.optimal.high,
            self.warning.low,
            self.warning.high,
            self.ideal,
            self.weight,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            problems.push("all profile values must be finite".to_string());
            return problems;
        }
        if self.optimal.width() <= 0.0 {
            problems.push(format!(
                "optimal range [{}, {}] must have positive width",
                self.optimal.low, self.optimal.high
            ));
        }
        if !self.warning.encloses(&self.optimal) {
            problems.push(format!(
                "warning range [{}, {}] must enclose optimal range [{}, {}]",
                self.warning.low, self.warning.high, self.optimal.low, self.optimal.high
            ));
        }
        if !self.optimal.contains(self.ideal) {
            problems.push(format!("ideal {} must lie inside the optimal range", self.ideal));
        } else {
            if self.ideal == self.optimal.low && !self.lower_open() {
                problems.push("ideal may only sit on the lower optimal bound when the lower side is open".to_string());
            }
            if self.ideal == self.optimal.high && !self.upper_open() {
                problems.push("ideal may only sit on the upper optimal bound when the upper side is open".to_string());
            }
        }
        if self.weight < 0.0 {
            problems.push(format!("weight {} cannot be negative", self.weight));
        }
        problems
    }
}

/// One time-stamped sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric_type: MetricType,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub const fn new(metric_type: MetricType, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            metric_type,
            timestamp,
            value,
        }
    }
}
