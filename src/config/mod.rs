//! Engine Configuration Module
//!
//! Scoring, trend, risk and service settings loaded from TOML, replacing
//! hardcoded tuning numbers with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `EQUIPMENT_HEALTH_CONFIG` environment variable (path to TOML file)
//! 2. `health_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! The configuration is passed explicitly to whatever needs it; there is no
//! process-wide instance:
//!
//! ```ignore
//! let config = EngineConfig::load();
//! let engine = HealthEngine::new(&config);
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
