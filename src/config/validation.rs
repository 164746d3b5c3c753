//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::EngineConfig;
use crate::types::MetricType;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Keys accepted inside every `[profiles.<metric>]` table.
const PROFILE_FIELDS: &[&str] = &[
    "optimal",
    "optimal.low",
    "optimal.high",
    "warning",
    "warning.low",
    "warning.high",
    "ideal",
    "weight",
];

/// Returns the complete set of valid dotted key paths for EngineConfig.
///
/// Section keys are maintained manually to match engine_config.rs; profile
/// keys are generated from the metric set.
pub fn known_config_keys() -> HashSet<String> {
    let keys: &[&str] = &[
        // [scoring]
        "scoring",
        "scoring.transition_fraction",
        "scoring.dispersion_dead_band",
        "scoring.penalty_per_band_width",
        "scoring.max_stability_penalty",
        "scoring.coverage_floor",
        "scoring.sample_saturation",
        // [trend]
        "trend",
        "trend.tolerance",
        "trend.min_baseline_samples",
        "trend.recent_fraction",
        "trend.steady_below",
        "trend.erratic_above",
        // [risk]
        "risk",
        "risk.low_min_score",
        "risk.medium_min_score",
        "risk.critical_metric_score",
        "risk.degraded_metric_score",
        "risk.alarm_escalation_threshold",
        // [fetch]
        "fetch",
        "fetch.timeout_secs",
        // [storage]
        "storage",
        "storage.path",
        "storage.unique_per_window",
        // [server]
        "server",
        "server.addr",
        // [profiles]
        "profiles",
    ];
    let mut known: HashSet<String> = keys.iter().map(|k| (*k).to_string()).collect();
    for metric in MetricType::ALL {
        let section = format!("profiles.{metric}");
        for field in PROFILE_FIELDS {
            known.insert(format!("{section}.{field}"));
        }
        known.insert(section);
    }
    known
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let a_len = a.chars().count();
    if a_len == 0 {
        return b.len();
    }
    if b.is_empty() {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for k in known {
        let k = k.as_str();
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Value Range Validation
// ============================================================================

/// Validate the value ranges of a parsed EngineConfig beyond the structural
/// checks in `EngineConfig::validate`.
///
/// Returns (errors, warnings): errors make the configuration unusable,
/// warnings are suspicious but not fatal.
pub fn validate_value_ranges(config: &EngineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // A full optimal-band shift still reading as "stable" defeats trend analysis
    if config.trend.tolerance >= 1.0 {
        errors.push(format!(
            "trend.tolerance = {:.3} must be < 1.0 (one optimal band width)",
            config.trend.tolerance
        ));
    }

    // Penalty larger than the optimal score band lets a noisy in-band metric
    // fall to the band floor on its first spike
    if config.scoring.max_stability_penalty > 45.0 {
        warnings.push(ValidationWarning {
            field: "scoring.max_stability_penalty".to_string(),
            message: format!(
                "scoring.max_stability_penalty = {:.1} is unusually large (typical 10-30)",
                config.scoring.max_stability_penalty
            ),
            suggestion: None,
        });
    }

    if config.fetch.timeout_secs > 600 {
        warnings.push(ValidationWarning {
            field: "fetch.timeout_secs".to_string(),
            message: format!(
                "fetch.timeout_secs = {} exceeds 10 minutes; report requests may hang",
                config.fetch.timeout_secs
            ),
            suggestion: None,
        });
    }

    if config.risk.alarm_escalation_threshold == 0 {
        warnings.push(ValidationWarning {
            field: "risk.alarm_escalation_threshold".to_string(),
            message: "risk.alarm_escalation_threshold = 0 escalates on any alarm".to_string(),
            suggestion: None,
        });
    }

    // Weights are renormalized per report, so a sum away from 1.0 is legal
    let weight_sum: f64 = MetricType::ALL
        .iter()
        .map(|m| config.profiles.resolve(*m).weight)
        .sum();
    if weight_sum.is_finite() && weight_sum > 0.0 && (weight_sum - 1.0).abs() > 0.01 {
        warnings.push(ValidationWarning {
            field: "profiles".to_string(),
            message: format!(
                "profile weights sum to {weight_sum:.3}; they will be normalized per report"
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOverride;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("tolerence", "tolerance"), 1);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein("température", "temperature"), 1);
        assert_eq!(levenshtein("°c", "c"), 1);
        assert_eq!(levenshtein("", "ü"), 1);
    }

    #[test]
    fn test_suggestion_for_accented_typo() {
        let keys = known_config_keys();
        assert_eq!(
            suggest_correction("profiles.température.weight", &keys).as_deref(),
            Some("profiles.temperature.weight")
        );
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [profiles.temperature]
            ideal = 45.0
            optimal = { low = 30.0, high = 55.0 }
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"profiles".to_string()));
        assert!(keys.contains(&"profiles.temperature".to_string()));
        assert!(keys.contains(&"profiles.temperature.ideal".to_string()));
        assert!(keys.contains(&"profiles.temperature.optimal.low".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[trend]
tolerence = 0.05
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("tolerence"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("trend.tolerance"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[scoring]
max_stability_penalty = 25.0

[risk]
alarm_escalation_threshold = 5

[storage]
path = "/var/lib/health/reports.db"
unique_per_window = true

[profiles.vibration]
warning = { low = 0.0, high = 4.5 }
weight = 0.25
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_metric_profile_produces_warning() {
        let toml_str = r#"
[profiles.humidity]
weight = 0.1
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.iter().any(|w| w.field == "profiles.humidity"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_known_keys_cover_every_metric() {
        let known = known_config_keys();
        for metric in MetricType::ALL {
            assert!(known.contains(&format!("profiles.{metric}.weight")));
            assert!(known.contains(&format!("profiles.{metric}.warning.high")));
        }
        assert!(known.contains("fetch.timeout_secs"));
    }

    #[test]
    fn test_value_ranges_defaults_clean() {
        let (errors, warnings) = validate_value_ranges(&EngineConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_tolerance_of_a_full_band_is_an_error() {
        let mut config = EngineConfig::default();
        config.trend.tolerance = 1.5;
        let (errors, _) = validate_value_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("trend.tolerance")));
    }

    #[test]
    fn test_unnormalized_weights_warn() {
        let mut config = EngineConfig::default();
        config.profiles.speed = Some(ProfileOverride {
            weight: Some(0.6),
            ..ProfileOverride::default()
        });
        let (errors, warnings) = validate_value_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "profiles"));
    }
}
