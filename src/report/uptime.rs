//! Uptime statistics from equipment status history
//!
//! Spans are clipped to the report window and swept in start order. Where
//! spans overlap, the earlier-starting span owns the overlap, so no instant
//! is counted twice. Time not covered by any span is unaccounted.

use crate::types::{EquipmentStatus, StatusSpan, TimeWindow, UptimeStats};

pub fn compute_uptime(spans: &[StatusSpan], window: &TimeWindow) -> UptimeStats {
    let total_ms = window.duration().num_milliseconds();
    if total_ms <= 0 {
        return UptimeStats::default();
    }

    let mut clipped: Vec<StatusSpan> = spans
        .iter()
        .filter_map(|s| {
            let from = s.from.max(window.start);
            let to = s.to.min(window.end);
            (from < to).then_some(StatusSpan { status: s.status, from, to })
        })
        .collect();
    clipped.sort_by_key(|s| (s.from, s.to));

    let mut running_ms = 0i64;
    let mut maintenance_ms = 0i64;
    let mut stopped_ms = 0i64;
    let mut transitions = 0usize;
    let mut cursor = window.start;
    let mut last_status: Option<EquipmentStatus> = None;

    for span in &clipped {
        let from = span.from.max(cursor);
        if from >= span.to {
            continue;
        }
        let ms = (span.to - from).num_milliseconds();
        match span.status {
            EquipmentStatus::Running => running_ms += ms,
            EquipmentStatus::Maintenance => maintenance_ms += ms,
            EquipmentStatus::Stopped => stopped_ms += ms,
        }
        if last_status.is_some_and(|prev| prev != span.status) {
            transitions += 1;
        }
        last_status = Some(span.status);
        cursor = span.to;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = |ms: i64| ms as f64 / total_ms as f64;
    let running_ratio = ratio(running_ms);
    let maintenance_ratio = ratio(maintenance_ms);
    let stopped_ratio = ratio(stopped_ms);

    UptimeStats {
        running_ratio,
        maintenance_ratio,
        stopped_ratio,
        unaccounted_ratio: (1.0 - running_ratio - maintenance_ratio - stopped_ratio).max(0.0),
        running_seconds: running_ms / 1000,
        maintenance_seconds: maintenance_ms / 1000,
        stopped_seconds: stopped_ms / 1000,
        transitions,
    }
}
