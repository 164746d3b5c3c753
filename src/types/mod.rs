//! Shared data structures for equipment health assessment
//!
//! - `metric`: metric types, samples, scoring profiles
//! - `equipment`: status history, alarm status, report windows
//! - `report`: contributions, trend/risk/level enums, the persisted report

mod equipment;
mod metric;
mod report;

pub use equipment::*;
pub use metric::*;
pub use report::*;
