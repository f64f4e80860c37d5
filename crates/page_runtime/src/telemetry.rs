/// Telemetry utilities for formatting and emitting pump counters.
/// Kept independent of the pump internals; callers pass in counters explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpCounters {
    pub applied_last: u64,
    pub applied_total: u64,
    pub dropped_last: u64,
    pub dropped_total: u64,
    pub errors_total: u64,
    pub slices_total: u64,
    /// Slices that stopped at a page that was not ready yet.
    pub blocked_slices: u64,
    /// Slices cut short by the time budget or the action cap.
    pub spillover_slices: u64,
    pub slice_time_last_us: u64,
    pub slice_time_total_us: u64,
    pub pending: u64,
}

pub fn pump_counters_json(counters: &PumpCounters) -> String {
    format!(
        "{{\"applied_last\":{},\"applied_total\":{},\"dropped_last\":{},\"dropped_total\":{},\"errors_total\":{},\"slices_total\":{},\"blocked_slices\":{},\"spillover_slices\":{},\"slice_time_last_us\":{},\"slice_time_total_us\":{},\"pending\":{}}}",
        counters.applied_last,
        counters.applied_total,
        counters.dropped_last,
        counters.dropped_total,
        counters.errors_total,
        counters.slices_total,
        counters.blocked_slices,
        counters.spillover_slices,
        counters.slice_time_last_us,
        counters.slice_time_total_us,
        counters.pending
    )
}

pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        log::info!(target: "trellis::runtime", "{json_line}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;

    #[test]
    fn json_line_parses_back() {
        let counters = PumpCounters {
            applied_last: 3,
            applied_total: 10,
            blocked_slices: 1,
            pending: 4,
            ..PumpCounters::default()
        };
        let line = pump_counters_json(&counters);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["applied_last"], 3);
        assert_eq!(value["applied_total"], 10);
        assert_eq!(value["blocked_slices"], 1);
        assert_eq!(value["pending"], 4);
        assert_eq!(value.as_object().unwrap().len(), 11);
    }
}
