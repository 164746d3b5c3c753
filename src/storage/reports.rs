//! Health Report Storage
//!
//! Persists HealthReports to Sled DB. Three trees:
//! - `reports`: report id (16 bytes) → JSON report
//! - `by_time`: generated-at nanos (u64 big-endian, sign-flipped) + id → id,
//!   giving newest-first listing by reverse iteration
//! - `window_index`: equipment set + exact window → id, only written when
//!   uniqueness per window is enabled

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::persistence::{window_key, PersistenceError, ReportRepository};
use crate::types::HealthReport;

const REPORTS_TREE: &str = "reports";
const BY_TIME_TREE: &str = "by_time";
const WINDOW_INDEX_TREE: &str = "window_index";

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Sled-backed report repository
#[derive(Clone)]
pub struct SledReportStore {
    db: Arc<sled::Db>,
    reports: sled::Tree,
    by_time: sled::Tree,
    window_index: sled::Tree,
    unique_per_window: bool,
}

impl SledReportStore {
    /// Open or create the report storage at the specified path
    pub fn open<P: AsRef<Path>>(path: P, unique_per_window: bool) -> Result<Self, PersistenceError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let store = Self {
            reports: db.open_tree(REPORTS_TREE)?,
            by_time: db.open_tree(BY_TIME_TREE)?,
            window_index: db.open_tree(WINDOW_INDEX_TREE)?,
            db: Arc::new(db),
            unique_per_window,
        };
        info!(path = ?path_ref, reports = store.reports.len(), "Report storage opened");
        Ok(store)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    /// Get database size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    fn time_key(report: &HealthReport) -> [u8; 24] {
        let nanos = report
            .generated_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| report.generated_at.timestamp_micros().saturating_mul(1_000));
        // Flip the sign bit so negative timestamps sort before positive ones
        #[allow(clippy::cast_sign_loss)]
        let ordered = (nanos as u64) ^ (1 << 63);
        let mut key = [0u8; 24];
        key[..8].copy_from_slice(&ordered.to_be_bytes());
        key[8..].copy_from_slice(report.id.as_bytes());
        key
    }

    fn decode(value: &[u8]) -> Result<HealthReport, PersistenceError> {
        Ok(serde_json::from_slice(value)?)
    }

    /// Claim the report's window. `Ok(true)` when this call made the claim,
    /// `Ok(false)` when the same report already held it.
    fn claim_window(&self, report: &HealthReport) -> Result<bool, PersistenceError> {
        let key = window_key(report);
        let claimed = self.window_index.compare_and_swap(
            key.as_bytes(),
            None as Option<&[u8]>,
            Some(report.id.as_bytes().as_slice()),
        )?;
        match claimed {
            Ok(()) => Ok(true),
            Err(cas) => {
                let existing = cas
                    .current
                    .and_then(|v| Uuid::from_slice(&v).ok())
                    .unwrap_or_else(Uuid::nil);
                if existing == report.id {
                    return Ok(false);
                }
                Err(PersistenceError::Duplicate {
                    equipment: report.equipment_ids.join(","),
                    start: report.window_start,
                    end: report.window_end,
                    existing,
                })
            }
        }
    }

    /// Drop the window claim if it still points at `report`.
    fn release_window(&self, report: &HealthReport) -> Result<(), PersistenceError> {
        let key = window_key(report);
        let _ = self.window_index.compare_and_swap(
            key.as_bytes(),
            Some(report.id.as_bytes().as_slice()),
            None as Option<&[u8]>,
        )?;
        Ok(())
    }

    /// Run `write` under the window claim; a failed write gives the claim back.
    fn with_window_claim<F>(&self, report: &HealthReport, write: F) -> Result<(), PersistenceError>
    where
        F: FnOnce() -> Result<(), PersistenceError>,
    {
        if !self.unique_per_window {
            return write();
        }
        let fresh = self.claim_window(report)?;
        if let Err(err) = write() {
            if fresh {
                if let Err(release) = self.release_window(report) {
                    warn!(id = %report.id, error = %release, "Failed to release window claim");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn write_entries(&self, report: &HealthReport, value: Vec<u8>) -> Result<(), PersistenceError> {
        self.reports.insert(report.id.as_bytes(), value)?;
        self.by_time.insert(Self::time_key(report), report.id.as_bytes().as_slice())?;
        Ok(())
    }
}

impl ReportRepository for SledReportStore {
    /// Key: report id, value: JSON-serialized HealthReport
    ///
    /// Does not flush on each write; sled flushes in the background.
    fn save(&self, report: &HealthReport) -> Result<(), PersistenceError> {
        let value = serde_json::to_vec(report)?;
        self.with_window_claim(report, || self.write_entries(report, value))?;
        debug!(id = %report.id, equipment = report.primary_equipment(), "Report stored");
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<HealthReport>, PersistenceError> {
        self.reports
            .get(id.as_bytes())?
            .map(|v| Self::decode(&v))
            .transpose()
    }

    fn list(&self, equipment_id: Option<&str>, limit: usize) -> Result<Vec<HealthReport>, PersistenceError> {
        let mut out = Vec::with_capacity(limit.min(64));
        // Newest first due to big-endian timestamp keys
        for item in self.by_time.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let (_key, id) = item?;
            let Some(value) = self.reports.get(&id)? else {
                continue;
            };
            match Self::decode(&value) {
                Ok(report) => {
                    if equipment_id.map_or(true, |e| report.covers_equipment(e)) {
                        out.push(report);
                    }
                }
                Err(e) => warn!(error = %e, "Skipping undecodable report"),
            }
        }
        Ok(out)
    }

    fn annotate(&self, id: Uuid, remarks: Option<String>) -> Result<HealthReport, PersistenceError> {
        let mut report = self.get(id)?.ok_or(PersistenceError::NotFound)?;
        report.remarks = remarks;
        self.reports.insert(id.as_bytes(), serde_json::to_vec(&report)?)?;
        Ok(report)
    }

    fn delete(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let Some(value) = self.reports.remove(id.as_bytes())? else {
            return Ok(false);
        };
        if let Ok(report) = Self::decode(&value) {
            self.by_time.remove(Self::time_key(&report))?;
            self.release_window(&report)?;
        }
        Ok(true)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.reports.len())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::make_report;
    use tempfile::tempdir;

    #[test]
    fn test_store_and_reload_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let report = make_report("compressor-2", 0);
        {
            let store = SledReportStore::open(&path, false).unwrap();
            store.save(&report).unwrap();
            store.flush().unwrap();
        }
        let store = SledReportStore::open(&path, false).unwrap();
        let loaded = store.get(report.id).unwrap().unwrap();
        assert_eq!(loaded, report);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_list_newest_first_with_filter() {
        let dir = tempdir().unwrap();
        let store = SledReportStore::open(dir.path(), false).unwrap();
        let old = make_report("pump-1", 0);
        let other = make_report("pump-9", 5);
        let new = make_report("pump-1", 10);
        for r in [&new, &old, &other] {
            store.save(r).unwrap();
        }
        let all = store.list(None, 10).unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![new.id, other.id, old.id]);

        let pump1 = store.list(Some("pump-1"), 1).unwrap();
        assert_eq!(pump1.len(), 1);
        assert_eq!(pump1[0].id, new.id);
    }

    #[test]
    fn test_annotate_and_delete() {
        let dir = tempdir().unwrap();
        let store = SledReportStore::open(dir.path(), true).unwrap();
        let report = make_report("mixer-4", 0);
        store.save(&report).unwrap();

        let updated = store.annotate(report.id, Some("checked on site".into())).unwrap();
        assert_eq!(store.get(report.id).unwrap().unwrap(), updated);
        assert_eq!(updated.score, report.score);

        assert!(store.delete(report.id).unwrap());
        assert!(store.get(report.id).unwrap().is_none());
        assert!(store.list(None, 10).unwrap().is_empty());
        // window released: a new report for the same window is accepted
        store.save(&make_report("mixer-4", 1)).unwrap();
    }

    #[test]
    fn test_unique_per_window_rejects_second_report() {
        let dir = tempdir().unwrap();
        let store = SledReportStore::open(dir.path(), true).unwrap();
        let first = make_report("line-1", 0);
        store.save(&first).unwrap();
        match store.save(&make_report("line-1", 3)) {
            Err(PersistenceError::Duplicate { existing, .. }) => assert_eq!(existing, first.id),
            other => panic!("expected duplicate, got {other:?}"),
        }
        store.save(&make_report("line-2", 3)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_failed_write_releases_window() {
        let dir = tempdir().unwrap();
        let store = SledReportStore::open(dir.path(), true).unwrap();
        let report = make_report("press-3", 0);

        let err = store
            .with_window_claim(&report, || Err(PersistenceError::Storage("disk full".into())))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Storage(_)));
        assert!(store.window_index.is_empty());
        assert_eq!(store.count().unwrap(), 0);

        let retry = make_report("press-3", 2);
        store.save(&retry).unwrap();
        assert_eq!(store.get(retry.id).unwrap().unwrap(), retry);
    }

    #[test]
    fn test_failed_resave_keeps_existing_claim() {
        let dir = tempdir().unwrap();
        let store = SledReportStore::open(dir.path(), true).unwrap();
        let report = make_report("press-4", 0);
        store.save(&report).unwrap();

        assert!(store
            .with_window_claim(&report, || Err(PersistenceError::Storage("io".into())))
            .is_err());
        match store.save(&make_report("press-4", 1)) {
            Err(PersistenceError::Duplicate { existing, .. }) => assert_eq!(existing, report.id),
            other => panic!("expected duplicate, got {other:?}"),
        }
    }
}
