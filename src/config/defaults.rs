//! System-wide default constants.
//!
//! Centralises the tuning numbers of the health engine. Grouped by
//! subsystem for easy discovery; every value can be overridden from
//! `health_config.toml`.

// ============================================================================
// SOH scoring
// ============================================================================

/// Score at the ideal point of the optimal range.
pub const SCORE_IDEAL: f64 = 100.0;

/// Score at the optimal range edges.
pub const SCORE_OPTIMAL_EDGE: f64 = 85.0;

/// Score just past the transition ramp into the warning range.
pub const SCORE_WARNING_START: f64 = 70.0;

/// Score at the warning range edges.
pub const SCORE_WARNING_EDGE: f64 = 40.0;

/// Share of the warning span used to ramp continuously from 85 down to 70.
pub const TRANSITION_FRACTION: f64 = 0.05;

/// Relative dispersion (std / optimal width) below which no penalty applies.
pub const DISPERSION_DEAD_BAND: f64 = 0.05;

/// Penalty points per optimal-band-width of standard deviation.
pub const PENALTY_PER_BAND_WIDTH: f64 = 40.0;

/// Upper bound on the stability penalty (points).
pub const MAX_STABILITY_PENALTY: f64 = 30.0;

/// Confidence reached with full coverage and a single sample per metric.
pub const COVERAGE_FLOOR: f64 = 0.6;

/// Samples per metric at which the sample-depth factor saturates.
pub const SAMPLE_SATURATION: usize = 30;

// ============================================================================
// Trend analysis
// ============================================================================

/// Mean change (relative to optimal width) treated as no change.
pub const TREND_TOLERANCE: f64 = 0.05;

/// Minimum valid baseline samples for a directional trend.
pub const MIN_BASELINE_SAMPLES: usize = 3;

/// Trailing share of the report window treated as "recent".
pub const RECENT_FRACTION: f64 = 0.5;

/// Relative dispersion below which the recent window is "steady".
pub const STEADY_BELOW: f64 = 0.1;

/// Relative dispersion at or above which the recent window is "erratic".
pub const ERRATIC_ABOVE: f64 = 0.3;

// ============================================================================
// Risk classification
// ============================================================================

/// Composite score at or above which base risk is Low.
pub const RISK_LOW_MIN_SCORE: f64 = 75.0;

/// Composite score at or above which base risk is Medium.
pub const RISK_MEDIUM_MIN_SCORE: f64 = 60.0;

/// Metric score below which a contribution is critical (escalates risk).
pub const CRITICAL_METRIC_SCORE: f64 = 40.0;

/// Metric score below which a metric gets targeted suggestions.
pub const DEGRADED_METRIC_SCORE: f64 = 70.0;

/// Alarm count in the window above which risk escalates.
pub const ALARM_ESCALATION_THRESHOLD: u64 = 10;

// ============================================================================
// Collaborators & storage
// ============================================================================

/// Upper bound on the time-series fetch step (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Default sled database path for persisted reports.
pub const REPORT_DB_PATH: &str = "./data/health_reports.db";

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Maximum reports returned by a single listing call.
pub const MAX_LIST_LIMIT: usize = 1_000;

/// Capacity of the in-memory report store before oldest entries are evicted.
pub const IN_MEMORY_REPORT_CAPACITY: usize = 1_000;
