//! ReportRepository trait: pluggable report storage backend
//!
//! Abstracts health report persistence so backends can be swapped without
//! touching the assembler or the API:
//! - `InMemoryReportStore`: in-memory store for tests and minimal deployments
//! - `SledReportStore`: durable sled backend (see `reports.rs`)

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::HealthReport;

/// Trait for pluggable report persistence backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
pub trait ReportRepository: Send + Sync {
    /// Store a newly generated report
    fn save(&self, report: &HealthReport) -> Result<(), PersistenceError>;

    /// Get a report by id
    fn get(&self, id: Uuid) -> Result<Option<HealthReport>, PersistenceError>;

    /// List reports, newest first, optionally restricted to one equipment
    fn list(&self, equipment_id: Option<&str>, limit: usize) -> Result<Vec<HealthReport>, PersistenceError>;

    /// Replace the remarks of a stored report; every other field is untouched
    fn annotate(&self, id: Uuid, remarks: Option<String>) -> Result<HealthReport, PersistenceError>;

    /// Delete a report, returning whether it existed
    fn delete(&self, id: Uuid) -> Result<bool, PersistenceError>;

    /// Number of stored reports
    fn count(&self) -> Result<usize, PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("not found")]
    NotFound,
    #[error("a report for {equipment} over {start} .. {end} already exists ({existing})")]
    Duplicate {
        equipment: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        existing: Uuid,
    },
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Uniqueness key for one equipment set over one exact window.
///
/// Each id is length-prefixed so ids containing separators cannot collide.
pub(crate) fn window_key(report: &HealthReport) -> String {
    let mut ids = report.equipment_ids.clone();
    ids.sort();
    let ids: String = ids.iter().map(|id| format!("{}:{id};", id.len())).collect();
    format!(
        "{}|{}|{}",
        ids,
        report.window_start.to_rfc3339(),
        report.window_end.to_rfc3339()
    )
}

/// In-memory persistence for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable: data is lost on restart.
pub struct InMemoryReportStore {
    reports: RwLock<Vec<HealthReport>>,
    max_reports: usize,
    unique_per_window: bool,
}

impl InMemoryReportStore {
    /// Create a new in-memory store with default limits
    pub fn new() -> Self {
        Self::with_capacity(crate::config::defaults::IN_MEMORY_REPORT_CAPACITY)
    }

    pub fn with_capacity(max_reports: usize) -> Self {
        Self {
            reports: RwLock::new(Vec::new()),
            max_reports: max_reports.max(1),
            unique_per_window: false,
        }
    }

    /// Reject a second report for the same equipment and window.
    #[must_use]
    pub const fn unique_per_window(mut self, enabled: bool) -> Self {
        self.unique_per_window = enabled;
        self
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRepository for InMemoryReportStore {
    fn save(&self, report: &HealthReport) -> Result<(), PersistenceError> {
        let mut store = self
            .reports
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        if self.unique_per_window {
            let key = window_key(report);
            if let Some(existing) = store.iter().find(|r| r.id != report.id && window_key(r) == key) {
                return Err(PersistenceError::Duplicate {
                    equipment: existing.equipment_ids.join(","),
                    start: report.window_start,
                    end: report.window_end,
                    existing: existing.id,
                });
            }
        }

        store.retain(|r| r.id != report.id);
        store.push(report.clone());

        // Evict oldest if over limit
        if store.len() > self.max_reports {
            store.remove(0);
        }

        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<HealthReport>, PersistenceError> {
        let store = self
            .reports
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(store.iter().find(|r| r.id == id).cloned())
    }

    fn list(&self, equipment_id: Option<&str>, limit: usize) -> Result<Vec<HealthReport>, PersistenceError> {
        let store = self
            .reports
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(store
            .iter()
            .rev()
            .filter(|r| equipment_id.map_or(true, |id| r.covers_equipment(id)))
            .take(limit)
            .cloned()
            .collect())
    }

    fn annotate(&self, id: Uuid, remarks: Option<String>) -> Result<HealthReport, PersistenceError> {
        let mut store = self
            .reports
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let report = store
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PersistenceError::NotFound)?;
        report.remarks = remarks;
        Ok(report.clone())
    }

    fn delete(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let mut store = self
            .reports
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let before = store.len();
        store.retain(|r| r.id != id);
        Ok(store.len() != before)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        let store = self
            .reports
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        Ok(store.len())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::make_report;

    #[test]
    fn test_window_key_separates_ids_with_commas() {
        let joined = make_report("a,b", 0);
        let mut pair = joined.clone();
        pair.equipment_ids = vec!["a".into(), "b".into()];
        assert_ne!(window_key(&joined), window_key(&pair));

        let mut swapped = pair.clone();
        swapped.equipment_ids = vec!["b".into(), "a".into()];
        assert_eq!(window_key(&pair), window_key(&swapped));
    }

    #[test]
    fn test_unique_window_accepts_distinct_comma_sets() {
        let store = InMemoryReportStore::new().unique_per_window(true);
        let joined = make_report("a,b", 0);
        let mut pair = make_report("a", 1);
        pair.equipment_ids = vec!["a".into(), "b".into()];
        store.save(&joined).unwrap();
        store.save(&pair).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_in_memory_store_and_retrieve() {
        let store = InMemoryReportStore::new();
        let report = make_report("pump-1", 0);
        store.save(&report).unwrap();

        let retrieved = store.get(report.id).unwrap();
        assert_eq!(retrieved, Some(report));
    }

    #[test]
    fn test_in_memory_list_order_and_filter() {
        let store = InMemoryReportStore::new();
        let a = make_report("pump-1", 0);
        let b = make_report("pump-2", 1);
        let c = make_report("pump-1", 2);
        for r in [&a, &b, &c] {
            store.save(r).unwrap();
        }

        let list = store.list(None, 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, c.id); // most recent first
        assert_eq!(list[1].id, b.id);

        let pump1 = store.list(Some("pump-1"), 10).unwrap();
        assert_eq!(pump1.iter().map(|r| r.id).collect::<Vec<_>>(), vec![c.id, a.id]);
    }

    #[test]
    fn test_annotate_only_changes_remarks() {
        let store = InMemoryReportStore::new();
        let report = make_report("fan-3", 0);
        store.save(&report).unwrap();

        let updated = store.annotate(report.id, Some("bearing replaced".to_string())).unwrap();
        assert_eq!(updated.remarks.as_deref(), Some("bearing replaced"));
        assert_eq!(HealthReport { remarks: None, ..updated }, report);
        assert!(matches!(
            store.annotate(Uuid::new_v4(), None),
            Err(PersistenceError::NotFound)
        ));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = InMemoryReportStore::with_capacity(2);
        let first = make_report("m", 0);
        store.save(&first).unwrap();
        store.save(&make_report("m", 1)).unwrap();
        store.save(&make_report("m", 2)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get(first.id).unwrap().is_none());
    }

    #[test]
    fn test_unique_per_window() {
        let store = InMemoryReportStore::new().unique_per_window(true);
        let first = make_report("m", 0);
        let mut second = make_report("m", 0);
        second.generated_at = first.generated_at;
        store.save(&first).unwrap();
        assert!(matches!(store.save(&second), Err(PersistenceError::Duplicate { .. })));
        // re-saving the same report is not a duplicate
        store.save(&first).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn ReportRepository> = Box::new(InMemoryReportStore::new());
        assert_eq!(store.backend_name(), "InMemory");
        let report = make_report("x", 0);
        store.save(&report).unwrap();
        assert!(store.delete(report.id).unwrap());
        assert!(!store.delete(report.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }
}
