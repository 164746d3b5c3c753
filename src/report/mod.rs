//! Report Assembler
//!
//! Orchestrates one report request end to end:
//!
//! ```text
//! request ─▶ validate ─▶ registry check ─▶ fetch (samples, alarms, status)
//!         ─▶ SOH + trends (per equipment, rayon) ─▶ combine ─▶ risk ─▶ persist
//! ```
//!
//! Collaborators are injected as trait objects; the assembler itself holds no
//! mutable state and can be shared across requests.

pub mod aggregate;
pub mod uptime;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use aggregate::{Combined, MemberOutcome};
pub use uptime::compute_uptime;

use crate::config::EngineConfig;
use crate::engine::{HealthEngine, WeightMap};
use crate::sources::{AlarmStore, EquipmentRegistry, StoreError, TimeSeriesStore};
use crate::storage::{PersistenceError, ReportRepository};
use crate::types::{
    AlarmStatus, HealthLevel, HealthReport, MetricSample, ReportType, StatusSpan, TimeWindow,
};

/// Errors surfaced by report generation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("equipment not found: {0}")]
    NotFound(String),
    #[error("collaborator store failed: {0}")]
    Store(#[from] StoreError),
    #[error("time-series fetch for {equipment} timed out after {seconds}s")]
    Timeout { equipment: String, seconds: u64 },
    #[error("failed to persist report: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("scoring task failed: {0}")]
    Scoring(String),
}

fn default_requested_by() -> String {
    "system".to_string()
}

/// Input of [`ReportAssembler::generate_report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub equipment_ids: Vec<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default = "default_requested_by")]
    pub requested_by: String,
    /// Per-call weight overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightMap>,
    /// Produce an aggregate report even for a single equipment
    #[serde(default)]
    pub aggregate: bool,
}

impl ReportRequest {
    pub fn single(equipment_id: impl Into<String>, window: TimeWindow) -> Self {
        Self::new(vec![equipment_id.into()], window)
    }

    pub fn new(equipment_ids: Vec<String>, window: TimeWindow) -> Self {
        Self {
            equipment_ids,
            window_start: window.start,
            window_end: window.end,
            requested_by: default_requested_by(),
            weights: None,
            aggregate: false,
        }
    }

    #[must_use]
    pub fn requested_by(mut self, who: impl Into<String>) -> Self {
        self.requested_by = who.into();
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: WeightMap) -> Self {
        self.weights = Some(weights);
        self
    }

    pub const fn window(&self) -> TimeWindow {
        TimeWindow::new(self.window_start, self.window_end)
    }

    /// Unique, non-empty equipment ids in request order.
    fn validated_ids(&self) -> Result<Vec<String>, EngineError> {
        if self.equipment_ids.is_empty() {
            return Err(EngineError::InvalidRequest("at least one equipment id is required".into()));
        }
        let mut ids: Vec<String> = Vec::with_capacity(self.equipment_ids.len());
        for id in &self.equipment_ids {
            let id = id.trim();
            if id.is_empty() {
                return Err(EngineError::InvalidRequest("equipment id cannot be empty".into()));
            }
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        if !self.window().is_valid() {
            return Err(EngineError::InvalidRequest(format!(
                "window start {} must be before end {}",
                self.window_start, self.window_end
            )));
        }
        Ok(ids)
    }
}

/// Raw collaborator data for one equipment.
#[derive(Debug, Clone)]
struct EquipmentInputs {
    equipment_id: String,
    samples: Vec<MetricSample>,
    alarm_counts: BTreeMap<AlarmStatus, u64>,
    status_history: Vec<StatusSpan>,
}

#[derive(Clone)]
pub struct ReportAssembler {
    engine: HealthEngine,
    series: Arc<dyn TimeSeriesStore>,
    alarms: Arc<dyn AlarmStore>,
    registry: Arc<dyn EquipmentRegistry>,
    repository: Arc<dyn ReportRepository>,
    fetch_timeout: Duration,
}

impl ReportAssembler {
    pub fn new(
        engine: HealthEngine,
        series: Arc<dyn TimeSeriesStore>,
        alarms: Arc<dyn AlarmStore>,
        registry: Arc<dyn EquipmentRegistry>,
        repository: Arc<dyn ReportRepository>,
    ) -> Self {
        Self {
            engine,
            series,
            alarms,
            registry,
            repository,
            fetch_timeout: Duration::from_secs(crate::config::defaults::FETCH_TIMEOUT_SECS),
        }
    }

    /// Engine and fetch timeout taken from the configuration.
    pub fn from_config(
        config: &EngineConfig,
        series: Arc<dyn TimeSeriesStore>,
        alarms: Arc<dyn AlarmStore>,
        registry: Arc<dyn EquipmentRegistry>,
        repository: Arc<dyn ReportRepository>,
    ) -> Self {
        Self::new(HealthEngine::new(config), series, alarms, registry, repository)
            .with_fetch_timeout(Duration::from_secs(config.fetch.timeout_secs))
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub const fn engine(&self) -> &HealthEngine {
        &self.engine
    }

    pub fn repository(&self) -> &Arc<dyn ReportRepository> {
        &self.repository
    }

    /// Generate, persist and return a health report.
    ///
    /// Nothing is persisted when validation, lookup or fetching fails.
    pub async fn generate_report(&self, request: ReportRequest) -> Result<HealthReport, EngineError> {
        let ids = request.validated_ids()?;
        let window = request.window();

        for id in &ids {
            if !self.registry.exists(id).await? {
                return Err(EngineError::NotFound(id.clone()));
            }
        }

        let inputs = try_join_all(ids.iter().map(|id| self.fetch_inputs(id, &window))).await?;

        // Scoring is CPU-bound; keep it off the async workers.
        let weights = request.weights.clone();
        let engine = self.engine.clone();
        let members: Vec<MemberOutcome> = tokio::task::spawn_blocking(move || {
            inputs
                .into_par_iter()
                .map(|input| MemberOutcome {
                    assessment: engine.assess(&window, &input.samples, weights.as_ref()),
                    uptime: compute_uptime(&input.status_history, &window),
                    equipment_id: input.equipment_id,
                    alarm_counts: input.alarm_counts,
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| EngineError::Scoring(e.to_string()))?;

        let report_type = if members.len() > 1 || request.aggregate {
            ReportType::Aggregate
        } else {
            ReportType::Single
        };
        let combined = match report_type {
            ReportType::Single => members
                .into_iter()
                .next()
                .map_or_else(|| Combined::aggregate(&[]), Combined::single),
            ReportType::Aggregate => Combined::aggregate(&members),
        };

        let risk = self
            .engine
            .risk()
            .classify_risk(combined.score, &combined.contributions, combined.alarm_count);

        let report = HealthReport {
            id: Uuid::new_v4(),
            equipment_ids: ids,
            report_type,
            window_start: window.start,
            window_end: window.end,
            score: combined.score,
            level: HealthLevel::from_score(combined.score),
            confidence: combined.confidence,
            contributions: combined.contributions,
            trends: combined.trends,
            uptime: combined.uptime,
            alarm_count: combined.alarm_count,
            alarm_counts: combined.alarm_counts,
            risk_level: risk.level,
            suggestions: risk.suggestions,
            members: combined.members,
            generated_at: Utc::now(),
            generated_by: request.requested_by,
            remarks: None,
        };

        self.repository.save(&report)?;

        info!(
            id = %report.id,
            equipment = report.primary_equipment(),
            report_type = ?report.report_type,
            score = format!("{:.1}", report.score),
            level = %report.level,
            risk = %report.risk_level,
            confidence = format!("{:.2}", report.confidence),
            "Health report generated"
        );

        Ok(report)
    }

    async fn fetch_inputs(&self, equipment_id: &str, window: &TimeWindow) -> Result<EquipmentInputs, EngineError> {
        let samples = async {
            match tokio::time::timeout(self.fetch_timeout, self.series.query(equipment_id, None, window)).await {
                Ok(result) => result.map_err(EngineError::from),
                Err(_) => {
                    warn!(equipment = equipment_id, "Time-series fetch timed out");
                    Err(EngineError::Timeout {
                        equipment: equipment_id.to_string(),
                        seconds: self.fetch_timeout.as_secs(),
                    })
                }
            }
        };
        let alarms = async {
            self.alarms
                .count_by_status(equipment_id, window)
                .await
                .map_err(EngineError::from)
        };
        let history = async {
            self.registry
                .status_history(equipment_id, window)
                .await
                .map_err(EngineError::from)
        };

        let (samples, alarm_counts, status_history) = tokio::try_join!(samples, alarms, history)?;
        debug!(
            equipment = equipment_id,
            samples = samples.len(),
            spans = status_history.len(),
            "Fetched report inputs"
        );
        Ok(EquipmentInputs {
            equipment_id: equipment_id.to_string(),
            samples,
            alarm_counts,
            status_history,
        })
    }
}
