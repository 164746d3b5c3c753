//! Equipment Health: state-of-health assessment for monitored equipment
//!
//! Turns time-stamped sensor readings and alarm history for an equipment unit
//! over a time window into a health report: a 0-100 score, a health level,
//! per-metric contributions and trends, a confidence figure, uptime and a
//! risk classification with maintenance suggestions.
//!
//! ## Architecture
//!
//! - **Engine**: profile table, SOH calculator, trend analyzer, risk classifier
//! - **Report Assembler**: fetches collaborator data, scores, combines, persists
//! - **Sources**: collaborator traits (time series, alarms, registry) + adapters
//! - **Storage**: report repository (sled, in-memory)
//! - **API**: thin axum surface over the assembler

pub mod api;
pub mod config;
pub mod engine;
pub mod report;
pub mod sources;
pub mod storage;
pub mod types;

// Re-export engine configuration
pub use config::EngineConfig;

// Re-export the engine
pub use engine::{
    HealthEngine, RiskAssessment, RiskClassifier, SamplesByMetric, SohCalculator, SohResult,
    TrendAnalyzer, WeightMap,
};

// Re-export report generation
pub use report::{EngineError, ReportAssembler, ReportRequest};

// Re-export storage
pub use storage::{InMemoryReportStore, PersistenceError, ReportRepository, SledReportStore};

// Re-export commonly used types
pub use types::{
    HealthLevel, HealthReport, MetricContribution, MetricSample, MetricType, ReportType, RiskLevel,
    TimeWindow, TrendDirection,
};
