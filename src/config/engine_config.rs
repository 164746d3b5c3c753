//! Engine Configuration - all scoring constants as operator-tunable TOML values
//!
//! Each struct implements `Default` with values from [`super::defaults`],
//! ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::{MetricProfile, MetricType, Range};

/// Environment variable holding the config file path.
pub const CONFIG_ENV_VAR: &str = "EQUIPMENT_HEALTH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "health_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the health engine and its service wrapper.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$EQUIPMENT_HEALTH_CONFIG` env var
/// 2. `./health_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SOH scoring curve, stability penalty and confidence
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Recent-vs-baseline trend analysis
    #[serde(default)]
    pub trend: TrendConfig,

    /// Risk bands and escalation
    #[serde(default)]
    pub risk: RiskConfig,

    /// Collaborator fetch limits
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Report persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-metric profile overrides
    #[serde(default)]
    pub profiles: ProfileOverrides,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$EQUIPMENT_HEALTH_CONFIG` environment variable
    /// 2. `./health_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys only produce warnings; semantic problems are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Fractions lie in (0, 1), penalties and counts are positive
    /// - Risk bands are ordered, metric thresholds are ordered
    /// - Every effective metric profile is structurally valid
    /// - All numbers are finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.scoring;
        Self::check_fraction(s.transition_fraction, "scoring.transition_fraction", &mut errors);
        Self::check_fraction(s.coverage_floor, "scoring.coverage_floor", &mut errors);
        if !s.dispersion_dead_band.is_finite() || s.dispersion_dead_band < 0.0 {
            errors.push("scoring.dispersion_dead_band must be >= 0".to_string());
        }
        if !s.penalty_per_band_width.is_finite() || s.penalty_per_band_width < 0.0 {
            errors.push("scoring.penalty_per_band_width must be >= 0".to_string());
        }
        if !s.max_stability_penalty.is_finite() || !(0.0..=100.0).contains(&s.max_stability_penalty) {
            errors.push("scoring.max_stability_penalty must be within 0-100".to_string());
        }
        if s.sample_saturation == 0 {
            errors.push("scoring.sample_saturation must be > 0".to_string());
        }

        let t = &self.trend;
        Self::check_fraction(t.recent_fraction, "trend.recent_fraction", &mut errors);
        if !t.tolerance.is_finite() || t.tolerance < 0.0 {
            errors.push("trend.tolerance must be >= 0".to_string());
        }
        if !t.steady_below.is_finite() || !t.erratic_above.is_finite() || t.steady_below <= 0.0 {
            errors.push("trend.steady_below must be > 0 and thresholds finite".to_string());
        } else if t.erratic_above <= t.steady_below {
            errors.push(format!(
                "trend.erratic_above ({:.3}) must be > steady_below ({:.3})",
                t.erratic_above, t.steady_below
            ));
        }
        if t.min_baseline_samples == 0 {
            errors.push("trend.min_baseline_samples must be > 0".to_string());
        }

        let r = &self.risk;
        Self::check_score(r.low_min_score, "risk.low_min_score", &mut errors);
        Self::check_score(r.medium_min_score, "risk.medium_min_score", &mut errors);
        Self::check_score(r.critical_metric_score, "risk.critical_metric_score", &mut errors);
        Self::check_score(r.degraded_metric_score, "risk.degraded_metric_score", &mut errors);
        if r.medium_min_score >= r.low_min_score {
            errors.push(format!(
                "risk.medium_min_score ({:.1}) must be < low_min_score ({:.1})",
                r.medium_min_score, r.low_min_score
            ));
        }
        if r.critical_metric_score > r.degraded_metric_score {
            errors.push(format!(
                "risk.critical_metric_score ({:.1}) must be <= degraded_metric_score ({:.1})",
                r.critical_metric_score, r.degraded_metric_score
            ));
        }

        if self.fetch.timeout_secs == 0 {
            errors.push("fetch.timeout_secs must be > 0".to_string());
        }
        if self.storage.path.trim().is_empty() {
            errors.push("storage.path cannot be empty".to_string());
        }
        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr '{}' is not a valid socket address", self.server.addr));
        }

        for metric in MetricType::ALL {
            let profile = self.profiles.resolve(metric);
            for problem in profile.problems() {
                errors.push(format!("profiles.{metric}: {problem}"));
            }
        }
        let weight_sum: f64 = MetricType::ALL
            .iter()
            .map(|m| self.profiles.resolve(*m).weight)
            .sum();
        if weight_sum <= 0.0 {
            errors.push("profile weights cannot all be zero".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_value_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_fraction(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 || value >= 1.0 {
            errors.push(format!("{name} = {value} must be within (0, 1)"));
        }
    }

    fn check_score(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            errors.push(format!("{name} = {value} must be within 0-100"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {}", e),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Scoring
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Share of the warning span used for the 85 → 70 transition ramp
    #[serde(default = "default_transition_fraction")]
    pub transition_fraction: f64,

    /// Relative dispersion below which no stability penalty applies
    #[serde(default = "default_dispersion_dead_band")]
    pub dispersion_dead_band: f64,

    /// Penalty points per optimal-band-width of standard deviation
    #[serde(default = "default_penalty_per_band_width")]
    pub penalty_per_band_width: f64,

    /// Cap on the stability penalty (points)
    #[serde(default = "default_max_stability_penalty")]
    pub max_stability_penalty: f64,

    /// Confidence with full coverage and minimal samples
    #[serde(default = "default_coverage_floor")]
    pub coverage_floor: f64,

    /// Samples per metric at which sample depth saturates
    #[serde(default = "default_sample_saturation")]
    pub sample_saturation: usize,
}

fn default_transition_fraction() -> f64 { defaults::TRANSITION_FRACTION }
fn default_dispersion_dead_band() -> f64 { defaults::DISPERSION_DEAD_BAND }
fn default_penalty_per_band_width() -> f64 { defaults::PENALTY_PER_BAND_WIDTH }
fn default_max_stability_penalty() -> f64 { defaults::MAX_STABILITY_PENALTY }
fn default_coverage_floor() -> f64 { defaults::COVERAGE_FLOOR }
fn default_sample_saturation() -> usize { defaults::SAMPLE_SATURATION }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            transition_fraction: default_transition_fraction(),
            dispersion_dead_band: default_dispersion_dead_band(),
            penalty_per_band_width: default_penalty_per_band_width(),
            max_stability_penalty: default_max_stability_penalty(),
            coverage_floor: default_coverage_floor(),
            sample_saturation: default_sample_saturation(),
        }
    }
}

// ============================================================================
// Trend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Mean change (relative to optimal width) treated as Stable
    #[serde(default = "default_trend_tolerance")]
    pub tolerance: f64,

    /// Minimum baseline samples for a directional result
    #[serde(default = "default_min_baseline_samples")]
    pub min_baseline_samples: usize,

    /// Trailing share of the report window treated as recent
    #[serde(default = "default_recent_fraction")]
    pub recent_fraction: f64,

    /// Relative dispersion below which the recent window is steady
    #[serde(default = "default_steady_below")]
    pub steady_below: f64,

    /// Relative dispersion at or above which the recent window is erratic
    #[serde(default = "default_erratic_above")]
    pub erratic_above: f64,
}

fn default_trend_tolerance() -> f64 { defaults::TREND_TOLERANCE }
fn default_min_baseline_samples() -> usize { defaults::MIN_BASELINE_SAMPLES }
fn default_recent_fraction() -> f64 { defaults::RECENT_FRACTION }
fn default_steady_below() -> f64 { defaults::STEADY_BELOW }
fn default_erratic_above() -> f64 { defaults::ERRATIC_ABOVE }

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            tolerance: default_trend_tolerance(),
            min_baseline_samples: default_min_baseline_samples(),
            recent_fraction: default_recent_fraction(),
            steady_below: default_steady_below(),
            erratic_above: default_erratic_above(),
        }
    }
}

// ============================================================================
// Risk
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Composite score at or above which base risk is Low
    #[serde(default = "default_low_min_score")]
    pub low_min_score: f64,

    /// Composite score at or above which base risk is Medium
    #[serde(default = "default_medium_min_score")]
    pub medium_min_score: f64,

    /// Metric score below which a contribution escalates risk
    #[serde(default = "default_critical_metric_score")]
    pub critical_metric_score: f64,

    /// Metric score below which targeted suggestions are emitted
    #[serde(default = "default_degraded_metric_score")]
    pub degraded_metric_score: f64,

    /// Window alarm count above which risk escalates
    #[serde(default = "default_alarm_escalation_threshold")]
    pub alarm_escalation_threshold: u64,
}

fn default_low_min_score() -> f64 { defaults::RISK_LOW_MIN_SCORE }
fn default_medium_min_score() -> f64 { defaults::RISK_MEDIUM_MIN_SCORE }
fn default_critical_metric_score() -> f64 { defaults::CRITICAL_METRIC_SCORE }
fn default_degraded_metric_score() -> f64 { defaults::DEGRADED_METRIC_SCORE }
fn default_alarm_escalation_threshold() -> u64 { defaults::ALARM_ESCALATION_THRESHOLD }

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            low_min_score: default_low_min_score(),
            medium_min_score: default_medium_min_score(),
            critical_metric_score: default_critical_metric_score(),
            degraded_metric_score: default_degraded_metric_score(),
            alarm_escalation_threshold: default_alarm_escalation_threshold(),
        }
    }
}

// ============================================================================
// Fetch / Storage / Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Upper bound on one time-series query (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 { defaults::FETCH_TIMEOUT_SECS }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Reject a second report for the same equipment and exact window
    #[serde(default)]
    pub unique_per_window: bool,
}

fn default_storage_path() -> String { defaults::REPORT_DB_PATH.to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            unique_per_window: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String { defaults::SERVER_ADDR.to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Profile overrides
// ============================================================================

/// Partial override of one metric's built-in profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ProfileOverride {
    /// Apply this override on top of a base profile.
    ///
    /// When only the optimal range moves, the ideal follows to its midpoint.
    pub fn apply(&self, base: MetricProfile) -> MetricProfile {
        let optimal = self.optimal.unwrap_or(base.optimal);
        let ideal = match (self.ideal, self.optimal) {
            (Some(ideal), _) => ideal,
            (None, Some(opt)) => (opt.low + opt.high) / 2.0,
            (None, None) => base.ideal,
        };
        MetricProfile {
            optimal,
            warning: self.warning.unwrap_or(base.warning),
            ideal,
            weight: self.weight.unwrap_or(base.weight),
            unit: base.unit,
        }
    }
}

/// `[profiles.<metric>]` sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<ProfileOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<ProfileOverride>,
}

impl ProfileOverrides {
    pub const fn get(&self, metric: MetricType) -> Option<&ProfileOverride> {
        match metric {
            MetricType::Temperature => self.temperature.as_ref(),
            MetricType::Vibration => self.vibration.as_ref(),
            MetricType::Pressure => self.pressure.as_ref(),
            MetricType::Current => self.current.as_ref(),
            MetricType::Voltage => self.voltage.as_ref(),
            MetricType::Speed => self.speed.as_ref(),
            MetricType::Flow => self.flow.as_ref(),
        }
    }

    /// Effective profile for a metric: built-in default plus any override.
    pub fn resolve(&self, metric: MetricType) -> MetricProfile {
        let base = metric.default_profile();
        self.get(metric).map_or(base, |o| o.apply(base))
    }
}
