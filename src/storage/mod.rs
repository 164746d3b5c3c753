//! Health Report Storage
//!
//! Persistent storage for generated health reports. Backends implement
//! [`ReportRepository`]; sled is the durable one, the in-memory store serves
//! tests and throwaway runs.

pub mod persistence;
pub mod reports;

pub use persistence::{InMemoryReportStore, PersistenceError, ReportRepository};
pub use reports::SledReportStore;

use std::sync::Arc;

use crate::config::StorageConfig;

/// Open the configured durable backend.
pub fn open_repository(config: &StorageConfig) -> Result<Arc<dyn ReportRepository>, PersistenceError> {
    let store = SledReportStore::open(&config.path, config.unique_per_window)?;
    Ok(Arc::new(store))
}
