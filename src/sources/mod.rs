//! Collaborator abstractions: where samples, alarms and equipment come from.
//!
//! The engine never owns these systems; it only queries them through the
//! traits below. Provided adapters:
//! - `memory`: in-memory stores for tests, the CLI and the HTTP server
//! - `fixture`: JSON fixture loader that fills the in-memory stores

pub mod fixture;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::types::{AlarmStatus, MetricSample, MetricType, StatusSpan, TimeWindow};

pub use fixture::{Fixture, FixtureError};
pub use memory::{InMemoryAlarmStore, InMemoryRegistry, InMemoryTimeSeriesStore};

/// Errors raised by a collaborator store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Time-series sample source.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Samples for one equipment in `[window.start, window.end)`.
    ///
    /// `metric = None` returns every metric type.
    async fn query(
        &self,
        equipment_id: &str,
        metric: Option<MetricType>,
        window: &TimeWindow,
    ) -> Result<Vec<MetricSample>, StoreError>;
}

/// Alarm history source. Alarm semantics stay with the caller.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Alarms raised in the window, counted by status.
    async fn count_by_status(
        &self,
        equipment_id: &str,
        window: &TimeWindow,
    ) -> Result<BTreeMap<AlarmStatus, u64>, StoreError>;
}

/// Equipment registry.
#[async_trait]
pub trait EquipmentRegistry: Send + Sync {
    async fn exists(&self, equipment_id: &str) -> Result<bool, StoreError>;

    /// Status spans overlapping the window, in any order.
    async fn status_history(
        &self,
        equipment_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<StatusSpan>, StoreError>;
}
