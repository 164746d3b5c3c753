//! JSON fixture loader
//!
//! A fixture describes equipment, status history, alarms and raw samples.
//! Metric names are free-form strings at this boundary; names that do not
//! map to a known [`MetricType`] are skipped.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{InMemoryAlarmStore, InMemoryRegistry, InMemoryTimeSeriesStore, StoreError};
use crate::types::{AlarmStatus, MetricSample, MetricType, StatusSpan};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub equipment: Vec<FixtureEquipment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureEquipment {
    pub id: String,
    #[serde(default)]
    pub status_history: Vec<StatusSpan>,
    #[serde(default)]
    pub alarms: Vec<FixtureAlarm>,
    #[serde(default)]
    pub samples: Vec<FixtureSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixtureAlarm {
    pub raised_at: DateTime<Utc>,
    pub status: AlarmStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSample {
    pub metric: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// In-memory collaborators populated from a fixture.
#[derive(Debug, Clone)]
pub struct FixtureStores {
    pub registry: Arc<InMemoryRegistry>,
    pub series: Arc<InMemoryTimeSeriesStore>,
    pub alarms: Arc<InMemoryAlarmStore>,
}

/// Counts from one load, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub equipment: usize,
    pub samples: usize,
    pub skipped_samples: usize,
    pub alarms: usize,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let contents = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json(&self) -> Result<String, FixtureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fill the given stores with this fixture's content.
    pub fn populate(
        &self,
        registry: &InMemoryRegistry,
        series: &InMemoryTimeSeriesStore,
        alarms: &InMemoryAlarmStore,
    ) -> Result<LoadSummary, FixtureError> {
        let mut summary = LoadSummary::default();
        for eq in &self.equipment {
            registry.register(&eq.id)?;
            for span in &eq.status_history {
                registry.add_span(&eq.id, *span)?;
            }
            for alarm in &eq.alarms {
                alarms.record(&eq.id, alarm.raised_at, alarm.status)?;
            }
            summary.alarms += eq.alarms.len();

            let mut parsed = Vec::with_capacity(eq.samples.len());
            for s in &eq.samples {
                match s.metric.parse::<MetricType>() {
                    Ok(metric) => parsed.push(MetricSample::new(metric, s.timestamp, s.value)),
                    Err(e) => {
                        debug!(equipment = %eq.id, error = %e, "Skipping sample");
                        summary.skipped_samples += 1;
                    }
                }
            }
            summary.samples += parsed.len();
            series.insert(&eq.id, parsed)?;
            summary.equipment += 1;
        }
        Ok(summary)
    }

    /// Build fresh in-memory stores from this fixture.
    pub fn into_stores(self) -> Result<FixtureStores, FixtureError> {
        let stores = FixtureStores {
            registry: Arc::new(InMemoryRegistry::new()),
            series: Arc::new(InMemoryTimeSeriesStore::new()),
            alarms: Arc::new(InMemoryAlarmStore::new()),
        };
        let summary = self.populate(&stores.registry, &stores.series, &stores.alarms)?;
        info!(
            equipment = summary.equipment,
            samples = summary.samples,
            skipped = summary.skipped_samples,
            alarms = summary.alarms,
            "Fixture loaded"
        );
        Ok(stores)
    }
}
