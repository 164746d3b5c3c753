//! Combining per-equipment results into one report body
//!
//! Aggregate score and confidence are the arithmetic mean over members.
//! Per-metric detail is averaged over the members that reported the metric.

use std::collections::BTreeMap;

use crate::engine::EquipmentAssessment;
use crate::types::{
    AlarmStatus, MemberScore, MetricContribution, MetricType, StabilityNote, TrendAssessment,
    TrendDirection, UptimeStats,
};

/// Everything computed for one equipment before risk classification.
#[derive(Debug, Clone)]
pub struct MemberOutcome {
    pub equipment_id: String,
    pub assessment: EquipmentAssessment,
    pub alarm_counts: BTreeMap<AlarmStatus, u64>,
    pub uptime: UptimeStats,
}

impl MemberOutcome {
    pub fn alarm_count(&self) -> u64 {
        self.alarm_counts.values().sum()
    }
}

/// Report body shared by single and aggregate reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub score: f64,
    pub confidence: f64,
    pub contributions: BTreeMap<MetricType, MetricContribution>,
    pub trends: BTreeMap<MetricType, TrendAssessment>,
    pub alarm_counts: BTreeMap<AlarmStatus, u64>,
    pub alarm_count: u64,
    pub uptime: UptimeStats,
    pub members: Vec<MemberScore>,
}

impl Combined {
    pub fn single(member: MemberOutcome) -> Self {
        let alarm_count = member.alarm_count();
        Self {
            score: member.assessment.soh.score,
            confidence: member.assessment.soh.confidence,
            contributions: member.assessment.soh.contributions,
            trends: member.assessment.trends,
            alarm_counts: member.alarm_counts,
            alarm_count,
            uptime: member.uptime,
            members: Vec::new(),
        }
    }

    pub fn aggregate(members: &[MemberOutcome]) -> Self {
        if members.is_empty() {
            return Self {
                score: 0.0,
                confidence: 0.0,
                contributions: BTreeMap::new(),
                trends: BTreeMap::new(),
                alarm_counts: BTreeMap::new(),
                alarm_count: 0,
                uptime: UptimeStats::default(),
                members: Vec::new(),
            };
        }
        #[allow(clippy::cast_precision_loss)]
        let n = members.len() as f64;

        let score = members.iter().map(|m| m.assessment.soh.score).sum::<f64>() / n;
        let confidence = members.iter().map(|m| m.assessment.soh.confidence).sum::<f64>() / n;

        let mut alarm_counts = BTreeMap::new();
        for m in members {
            for (status, count) in &m.alarm_counts {
                *alarm_counts.entry(*status).or_insert(0) += count;
            }
        }
        let alarm_count = alarm_counts.values().sum();

        Self {
            score,
            confidence,
            contributions: average_contributions(members),
            trends: combine_trends(members),
            alarm_counts,
            alarm_count,
            uptime: combine_uptime(members.iter().map(|m| &m.uptime)),
            members: members
                .iter()
                .map(|m| MemberScore {
                    equipment_id: m.equipment_id.clone(),
                    score: m.assessment.soh.score,
                    confidence: m.assessment.soh.confidence,
                    alarm_count: m.alarm_count(),
                })
                .collect(),
        }
    }
}

/// Declining wins over Improving, which wins over Stable.
fn combine_directions(directions: impl Iterator<Item = TrendDirection>) -> TrendDirection {
    let mut out = TrendDirection::Stable;
    for d in directions {
        match d {
            TrendDirection::Declining => return TrendDirection::Declining,
            TrendDirection::Improving => out = TrendDirection::Improving,
            TrendDirection::Stable => {}
        }
    }
    out
}

fn average_contributions(members: &[MemberOutcome]) -> BTreeMap<MetricType, MetricContribution> {
    let mut grouped: BTreeMap<MetricType, Vec<&MetricContribution>> = BTreeMap::new();
    for m in members {
        for (metric, c) in &m.assessment.soh.contributions {
            grouped.entry(*metric).or_default().push(c);
        }
    }

    let mut out: BTreeMap<MetricType, MetricContribution> = grouped
        .into_iter()
        .map(|(metric, cs)| {
            #[allow(clippy::cast_precision_loss)]
            let k = cs.len() as f64;
            let avg = |f: fn(&MetricContribution) -> f64| cs.iter().map(|c| f(c)).sum::<f64>() / k;
            (
                metric,
                MetricContribution {
                    score: avg(|c| c.score),
                    weight: avg(|c| c.weight),
                    trend: combine_directions(cs.iter().map(|c| c.trend)),
                    sample_count: cs.iter().map(|c| c.sample_count).sum(),
                    mean: avg(|c| c.mean),
                    std_dev: avg(|c| c.std_dev),
                },
            )
        })
        .collect();

    let total: f64 = out.values().map(|c| c.weight).sum();
    if total > 0.0 {
        for c in out.values_mut() {
            c.weight /= total;
        }
    } else if !out.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let equal = 1.0 / out.len() as f64;
        for c in out.values_mut() {
            c.weight = equal;
        }
    }
    out
}

const fn stability_rank(s: StabilityNote) -> u8 {
    match s {
        StabilityNote::Steady => 0,
        StabilityNote::Fluctuating => 1,
        StabilityNote::Erratic => 2,
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    #[allow(clippy::cast_precision_loss)]
    (n > 0).then(|| sum / n as f64)
}

fn combine_trends(members: &[MemberOutcome]) -> BTreeMap<MetricType, TrendAssessment> {
    let mut grouped: BTreeMap<MetricType, Vec<&TrendAssessment>> = BTreeMap::new();
    for m in members {
        for (metric, t) in &m.assessment.trends {
            grouped.entry(*metric).or_default().push(t);
        }
    }
    grouped
        .into_iter()
        .map(|(metric, ts)| {
            let stability = ts
                .iter()
                .map(|t| t.stability)
                .max_by_key(|s| stability_rank(*s))
                .unwrap_or_default();
            (
                metric,
                TrendAssessment {
                    direction: combine_directions(ts.iter().map(|t| t.direction)),
                    stability,
                    recent_mean: mean_of(ts.iter().filter_map(|t| t.recent_mean)),
                    baseline_mean: mean_of(ts.iter().filter_map(|t| t.baseline_mean)),
                    relative_change: mean_of(ts.iter().map(|t| t.relative_change)).unwrap_or(0.0),
                },
            )
        })
        .collect()
}

fn combine_uptime<'a>(uptimes: impl Iterator<Item = &'a UptimeStats>) -> UptimeStats {
    let all: Vec<&UptimeStats> = uptimes.collect();
    let avg = |f: fn(&UptimeStats) -> f64| mean_of(all.iter().map(|u| f(u))).unwrap_or(0.0);
    UptimeStats {
        running_ratio: avg(|u| u.running_ratio),
        maintenance_ratio: avg(|u| u.maintenance_ratio),
        stopped_ratio: avg(|u| u.stopped_ratio),
        unaccounted_ratio: avg(|u| u.unaccounted_ratio),
        running_seconds: all.iter().map(|u| u.running_seconds).sum(),
        maintenance_seconds: all.iter().map(|u| u.maintenance_seconds).sum(),
        stopped_seconds: all.iter().map(|u| u.stopped_seconds).sum(),
        transitions: all.iter().map(|u| u.transitions).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SohResult;

    fn contribution(score: f64, weight: f64, trend: TrendDirection) -> MetricContribution {
        MetricContribution {
            score,
            weight,
            trend,
            sample_count: 10,
            mean: score / 2.0,
            std_dev: 1.0,
        }
    }

    fn member(id: &str, score: f64, confidence: f64, contributions: &[(MetricType, MetricContribution)]) -> MemberOutcome {
        MemberOutcome {
            equipment_id: id.to_string(),
            assessment: EquipmentAssessment {
                soh: SohResult {
                    score,
                    confidence,
                    contributions: contributions.iter().copied().collect(),
                },
                trends: BTreeMap::new(),
            },
            alarm_counts: [(AlarmStatus::Active, 2)].into(),
            uptime: UptimeStats {
                running_ratio: 0.5,
                running_seconds: 100,
                ..UptimeStats::default()
            },
        }
    }

    #[test]
    fn score_and_confidence_are_arithmetic_means() {
        let members = [
            member("a", 90.0, 0.9, &[]),
            member("b", 60.0, 0.3, &[]),
            member("c", 75.0, 0.6, &[]),
        ];
        let c = Combined::aggregate(&members);
        assert!((c.score - 75.0).abs() < 1e-12);
        assert!((c.confidence - 0.6).abs() < 1e-12);
        assert_eq!(c.members.len(), 3);
        assert_eq!(c.alarm_count, 6);
        assert_eq!(c.uptime.running_seconds, 300);
        assert!((c.uptime.running_ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn contributions_averaged_over_reporting_members() {
        let members = [
            member(
                "a",
                80.0,
                0.5,
                &[
                    (MetricType::Temperature, contribution(90.0, 0.6, TrendDirection::Improving)),
                    (MetricType::Vibration, contribution(70.0, 0.4, TrendDirection::Stable)),
                ],
            ),
            member(
                "b",
                70.0,
                0.5,
                &[(MetricType::Temperature, contribution(70.0, 1.0, TrendDirection::Declining))],
            ),
        ];
        let c = Combined::aggregate(&members);
        let temp = c.contributions[&MetricType::Temperature];
        assert!((temp.score - 80.0).abs() < 1e-12);
        assert_eq!(temp.trend, TrendDirection::Declining);
        assert_eq!(temp.sample_count, 20);
        let vib = c.contributions[&MetricType::Vibration];
        assert!((vib.score - 70.0).abs() < 1e-12);
        let weight_sum: f64 = c.contributions.values().map(|c| c.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn improving_beats_stable() {
        assert_eq!(
            combine_directions([TrendDirection::Stable, TrendDirection::Improving].into_iter()),
            TrendDirection::Improving
        );
        assert_eq!(combine_directions(std::iter::empty()), TrendDirection::Stable);
    }
}
