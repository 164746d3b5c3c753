//! Risk classification and maintenance suggestions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::types::{MetricContribution, MetricType, RiskLevel, TrendDirection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RiskClassifier {
    config: RiskConfig,
}

impl RiskClassifier {
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Classify risk from the composite score, per-metric detail and alarm count.
    ///
    /// Base level from score (≥75 Low, ≥60 Medium, else High), escalated one
    /// level at most when a metric is critical or declining, or when alarms
    /// exceed the threshold.
    pub fn classify_risk(
        &self,
        score: f64,
        contributions: &BTreeMap<MetricType, MetricContribution>,
        alarm_count: u64,
    ) -> RiskAssessment {
        let base = if score >= self.config.low_min_score {
            RiskLevel::Low
        } else if score >= self.config.medium_min_score {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        let critical_metric = contributions
            .values()
            .any(|c| c.score < self.config.critical_metric_score || c.trend == TrendDirection::Declining);
        let alarm_heavy = alarm_count > self.config.alarm_escalation_threshold;
        let level = if critical_metric || alarm_heavy {
            base.escalate()
        } else {
            base
        };

        RiskAssessment {
            level,
            suggestions: self.suggestions(level, contributions, alarm_count),
        }
    }

    fn suggestions(
        &self,
        level: RiskLevel,
        contributions: &BTreeMap<MetricType, MetricContribution>,
        alarm_count: u64,
    ) -> Vec<String> {
        // BTreeMap iterates in MetricType declaration order
        let mut out: Vec<String> = contributions
            .iter()
            .filter(|(_, c)| c.score < self.config.degraded_metric_score || c.trend == TrendDirection::Declining)
            .map(|(metric, c)| metric_suggestion(*metric, c))
            .collect();

        if alarm_count > self.config.alarm_escalation_threshold {
            out.push(format!(
                "{alarm_count} alarms in the window: review alarm history and confirm root causes before clearing"
            ));
        }
        if level == RiskLevel::High {
            out.push("High risk: schedule a maintenance inspection as soon as operations allow".to_string());
        }
        if out.is_empty() {
            out.push("All metrics within normal ranges: continue routine monitoring".to_string());
        }
        out
    }
}

fn metric_suggestion(metric: MetricType, c: &MetricContribution) -> String {
    let action = match metric {
        MetricType::Temperature => "check the cooling system, fans and ventilation paths",
        MetricType::Vibration => "inspect bearings, alignment and mounting bolts",
        MetricType::Pressure => "check seals, valves and lines for leaks or blockage",
        MetricType::Current => "review load conditions and inspect motor windings",
        MetricType::Voltage => "verify supply voltage stability and connections",
        MetricType::Speed => "inspect the drive train, couplings and speed control",
        MetricType::Flow => "check pumps and filters for wear or clogging",
    };
    let state = if c.trend == TrendDirection::Declining {
        "declining"
    } else {
        "degraded"
    };
    format!("{metric} {state} (score {:.0}): {action}", c.score)
}
