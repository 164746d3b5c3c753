//! In-memory collaborator stores
//!
//! Thread-safe via `RwLock`. Not durable; data lives as long as the value.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AlarmStore, EquipmentRegistry, StoreError, TimeSeriesStore};
use crate::types::{AlarmStatus, MetricSample, MetricType, StatusSpan, TimeWindow};

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryTimeSeriesStore {
    samples: RwLock<HashMap<String, Vec<MetricSample>>>,
}

impl InMemoryTimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, equipment_id: &str, samples: impl IntoIterator<Item = MetricSample>) -> Result<(), StoreError> {
        let mut map = self.samples.write().map_err(poisoned)?;
        map.entry(equipment_id.to_string()).or_default().extend(samples);
        Ok(())
    }
}

#[async_trait]
impl TimeSeriesStore for InMemoryTimeSeriesStore {
    async fn query(
        &self,
        equipment_id: &str,
        metric: Option<MetricType>,
        window: &TimeWindow,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let map = self.samples.read().map_err(poisoned)?;
        Ok(map
            .get(equipment_id)
            .map(|all| {
                all.iter()
                    .filter(|s| window.contains(s.timestamp))
                    .filter(|s| metric.map_or(true, |m| s.metric_type == m))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlarmRecord {
    raised_at: DateTime<Utc>,
    status: AlarmStatus,
}

#[derive(Debug, Default)]
pub struct InMemoryAlarmStore {
    alarms: RwLock<HashMap<String, Vec<AlarmRecord>>>,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, equipment_id: &str, raised_at: DateTime<Utc>, status: AlarmStatus) -> Result<(), StoreError> {
        let mut map = self.alarms.write().map_err(poisoned)?;
        map.entry(equipment_id.to_string())
            .or_default()
            .push(AlarmRecord { raised_at, status });
        Ok(())
    }
}

#[async_trait]
impl AlarmStore for InMemoryAlarmStore {
    async fn count_by_status(
        &self,
        equipment_id: &str,
        window: &TimeWindow,
    ) -> Result<BTreeMap<AlarmStatus, u64>, StoreError> {
        let map = self.alarms.read().map_err(poisoned)?;
        let mut counts = BTreeMap::new();
        for alarm in map.get(equipment_id).into_iter().flatten() {
            if window.contains(alarm.raised_at) {
                *counts.entry(alarm.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    equipment: RwLock<HashMap<String, Vec<StatusSpan>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, equipment_id: &str) -> Result<(), StoreError> {
        let mut map = self.equipment.write().map_err(poisoned)?;
        map.entry(equipment_id.to_string()).or_default();
        Ok(())
    }

    /// Append a status span; registers the equipment if needed.
    pub fn add_span(&self, equipment_id: &str, span: StatusSpan) -> Result<(), StoreError> {
        let mut map = self.equipment.write().map_err(poisoned)?;
        map.entry(equipment_id.to_string()).or_default().push(span);
        Ok(())
    }

    pub fn equipment_ids(&self) -> Result<Vec<String>, StoreError> {
        let map = self.equipment.read().map_err(poisoned)?;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl EquipmentRegistry for InMemoryRegistry {
    async fn exists(&self, equipment_id: &str) -> Result<bool, StoreError> {
        let map = self.equipment.read().map_err(poisoned)?;
        Ok(map.contains_key(equipment_id))
    }

    async fn status_history(
        &self,
        equipment_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<StatusSpan>, StoreError> {
        let map = self.equipment.read().map_err(poisoned)?;
        Ok(map
            .get(equipment_id)
            .map(|spans| {
                spans
                    .iter()
                    .filter(|s| s.from < window.end && s.to > window.start)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EquipmentStatus;
    use chrono::{Duration, TimeZone};

    fn window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        TimeWindow::new(start, start + Duration::hours(4))
    }

    #[tokio::test]
    async fn query_filters_window_and_metric() {
        let store = InMemoryTimeSeriesStore::new();
        let w = window();
        store
            .insert(
                "pump-1",
                [
                    MetricSample::new(MetricType::Flow, w.start, 70.0),
                    MetricSample::new(MetricType::Speed, w.start, 1450.0),
                    MetricSample::new(MetricType::Flow, w.end, 80.0),
                ],
            )
            .unwrap();
        assert_eq!(store.query("pump-1", None, &w).await.unwrap().len(), 2);
        assert_eq!(store.query("pump-1", Some(MetricType::Flow), &w).await.unwrap().len(), 1);
        assert!(store.query("pump-2", None, &w).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn alarms_counted_by_status() {
        let store = InMemoryAlarmStore::new();
        let w = window();
        store.record("m", w.start, AlarmStatus::Active).unwrap();
        store.record("m", w.start + Duration::hours(1), AlarmStatus::Active).unwrap();
        store.record("m", w.start, AlarmStatus::Resolved).unwrap();
        store.record("m", w.start - Duration::hours(1), AlarmStatus::Active).unwrap();
        let counts = store.count_by_status("m", &w).await.unwrap();
        assert_eq!(counts.get(&AlarmStatus::Active), Some(&2));
        assert_eq!(counts.get(&AlarmStatus::Resolved), Some(&1));
        assert_eq!(counts.get(&AlarmStatus::Acknowledged), None);
    }

    #[tokio::test]
    async fn registry_returns_overlapping_spans() {
        let registry = InMemoryRegistry::new();
        let w = window();
        registry.register("idle").unwrap();
        registry
            .add_span(
                "m",
                StatusSpan {
                    status: EquipmentStatus::Running,
                    from: w.start - Duration::hours(2),
                    to: w.start + Duration::hours(1),
                },
            )
            .unwrap();
        registry
            .add_span(
                "m",
                StatusSpan {
                    status: EquipmentStatus::Stopped,
                    from: w.end,
                    to: w.end + Duration::hours(1),
                },
            )
            .unwrap();
        assert!(registry.exists("idle").await.unwrap());
        assert!(!registry.exists("ghost").await.unwrap());
        assert_eq!(registry.status_history("m", &w).await.unwrap().len(), 1);
        assert_eq!(registry.equipment_ids().unwrap(), vec!["idle".to_string(), "m".to_string()]);
    }
}
