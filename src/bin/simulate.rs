//! Equipment Fixture Simulation
//!
//! Generates a JSON fixture (equipment, status history, alarms, samples) for
//! exercising the health engine. Scenarios:
//! - `healthy`: every metric hovers around its ideal value
//! - `degrading`: vibration and temperature drift toward the warning edge,
//!   alarms start in the second half, one maintenance stop
//! - `overheating`: temperature runs away past the warning range in the
//!   second half with a burst of active alarms
//!
//! # Usage
//! ```bash
//! ./simulate --scenario degrading --equipment 3 --seed 7 --output plant.json
//! ./equipment-health generate --fixture plant.json -e pump-1
//! ```

use std::io::{self, Write};

use chrono::{DateTime, Duration, DurationRound, Utc};
use clap::{Parser, ValueEnum};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use equipment_health::sources::fixture::{Fixture, FixtureAlarm, FixtureEquipment, FixtureSample};
use equipment_health::types::{AlarmStatus, EquipmentStatus, MetricType, StatusSpan};

/// Relative noise (fraction of the optimal width) around the target value
const NOISE_FRACTION: f64 = 0.04;
/// Alarms raised per equipment in the overheating scenario
const OVERHEAT_ALARMS: usize = 14;
/// Alarms raised per equipment in the degrading scenario
const DEGRADING_ALARMS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Healthy,
    Degrading,
    Overheating,
}

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Equipment health fixture generator")]
#[command(version)]
struct Args {
    /// Window length in hours
    #[arg(short = 'H', long, default_value = "24", value_parser = clap::value_parser!(i64).range(1..=720))]
    hours: i64,

    /// Number of equipment units (pump-1..pump-N)
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=100))]
    equipment: u32,

    /// Minutes between samples
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(i64).range(1..=60))]
    interval: i64,

    /// Scenario to simulate
    #[arg(short, long, value_enum, default_value_t = Scenario::Healthy)]
    scenario: Scenario,

    /// Window end (RFC 3339); defaults to now, rounded down to the hour
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Write the fixture here instead of stdout
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,
}

struct Simulator {
    rng: StdRng,
    scenario: Scenario,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
    unit_noise: Normal<f64>,
}

impl Simulator {
    fn new(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let end = match args.end {
            Some(end) => end,
            None => Utc::now().duration_trunc(Duration::hours(1))?,
        };
        Ok(Self {
            rng,
            scenario: args.scenario,
            start: end - Duration::hours(args.hours),
            end,
            interval: Duration::minutes(args.interval),
            unit_noise: Normal::new(0.0, 1.0)?,
        })
    }

    fn progress(&self, ts: DateTime<Utc>) -> f64 {
        let total = (self.end - self.start).num_seconds().max(1);
        #[allow(clippy::cast_precision_loss)]
        let p = (ts - self.start).num_seconds() as f64 / total as f64;
        p
    }

    /// Noise-free target value for a metric at the given progress (0..1).
    fn target(&self, metric: MetricType, progress: f64, severity: f64) -> f64 {
        let profile = metric.default_profile();
        let second_half = ((progress - 0.5) * 2.0).clamp(0.0, 1.0);
        match (self.scenario, metric) {
            (Scenario::Degrading, MetricType::Vibration) => {
                // ideal at the start, deep into the warning zone at the end
                profile.ideal + (profile.warning.high * 0.85 - profile.ideal) * progress * severity
            }
            (Scenario::Degrading, MetricType::Temperature) => {
                profile.ideal + (profile.optimal.high + 8.0 - profile.ideal) * progress * severity
            }
            (Scenario::Overheating, MetricType::Temperature) => {
                profile.ideal + (profile.warning.high + 10.0 - profile.ideal) * second_half * severity
            }
            (Scenario::Overheating, MetricType::Current) => {
                profile.ideal + (profile.optimal.high - profile.ideal) * second_half * severity
            }
            _ => profile.ideal,
        }
    }

    fn sample(&mut self, metric: MetricType, ts: DateTime<Utc>, severity: f64) -> FixtureSample {
        let profile = metric.default_profile();
        let target = self.target(metric, self.progress(ts), severity);
        let noise = self.unit_noise.sample(&mut self.rng) * profile.optimal.width() * NOISE_FRACTION;
        let mut value = target + noise;
        // physical lower bound for open-low metrics
        if profile.lower_open() {
            value = value.max(profile.warning.low);
        }
        FixtureSample {
            metric: metric.as_str().to_string(),
            timestamp: ts,
            value,
        }
    }

    fn status_history(&mut self) -> Vec<StatusSpan> {
        if self.scenario == Scenario::Healthy {
            return vec![StatusSpan {
                status: EquipmentStatus::Running,
                from: self.start,
                to: self.end,
            }];
        }
        let span = self.end - self.start;
        let stop_at = self.start + span * 3 / 5 + Duration::minutes(self.rng.gen_range(0..30));
        let stop_len = Duration::minutes(self.rng.gen_range(20..90));
        let stop_status = match self.scenario {
            Scenario::Overheating => EquipmentStatus::Stopped,
            _ => EquipmentStatus::Maintenance,
        };
        vec![
            StatusSpan {
                status: EquipmentStatus::Running,
                from: self.start,
                to: stop_at,
            },
            StatusSpan {
                status: stop_status,
                from: stop_at,
                to: stop_at + stop_len,
            },
            StatusSpan {
                status: EquipmentStatus::Running,
                from: stop_at + stop_len,
                to: self.end,
            },
        ]
    }

    fn alarms(&mut self) -> Vec<FixtureAlarm> {
        let count = match self.scenario {
            Scenario::Healthy => 0,
            Scenario::Degrading => DEGRADING_ALARMS,
            Scenario::Overheating => OVERHEAT_ALARMS,
        };
        let half = (self.end - self.start).num_seconds() / 2;
        (0..count)
            .map(|_| {
                let raised_at = self.start + Duration::seconds(half + self.rng.gen_range(0..half.max(1)));
                let status = match self.rng.gen_range(0..10) {
                    0..=5 => AlarmStatus::Active,
                    6..=7 => AlarmStatus::Acknowledged,
                    _ => AlarmStatus::Resolved,
                };
                FixtureAlarm { raised_at, status }
            })
            .collect()
    }

    fn equipment(&mut self, index: u32, total: u32) -> FixtureEquipment {
        // later units are hit harder so aggregate reports show a spread
        let severity = 0.6 + 0.4 * f64::from(index) / f64::from(total.max(1));
        let mut samples = Vec::new();
        let mut ts = self.start;
        while ts < self.end {
            for metric in MetricType::ALL {
                samples.push(self.sample(metric, ts, severity));
            }
            ts += self.interval;
        }
        FixtureEquipment {
            id: format!("pump-{index}"),
            status_history: self.status_history(),
            alarms: self.alarms(),
            samples,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut sim = Simulator::new(&args)?;

    let equipment = (1..=args.equipment)
        .map(|i| sim.equipment(i, args.equipment))
        .collect();
    let fixture = Fixture { equipment };
    let json = fixture.to_json()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!(
                "Wrote {:?} fixture for {} equipment ({} to {}) to {}",
                args.scenario,
                args.equipment,
                sim.start.to_rfc3339(),
                sim.end.to_rfc3339(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}
