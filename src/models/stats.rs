use serde::{Deserialize, Serialize};

/// Execution statistics reported on every page.
///
/// Counters are cumulative for the whole query; the final page's values are
/// authoritative. [`StatementStats::merge_from`] keeps the accumulated view
/// monotone even if an intermediate page reports stale numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementStats {
    /// Server-reported lifecycle state (`QUEUED`, `RUNNING`, `FINISHED`, ...).
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub queued: bool,

    #[serde(default)]
    pub scheduled: bool,

    #[serde(default)]
    pub nodes: u64,

    #[serde(default)]
    pub total_splits: u64,

    #[serde(default)]
    pub queued_splits: u64,

    #[serde(default)]
    pub running_splits: u64,

    #[serde(default)]
    pub completed_splits: u64,

    #[serde(default)]
    pub cpu_time_millis: u64,

    #[serde(default)]
    pub wall_time_millis: u64,

    #[serde(default)]
    pub processed_rows: u64,

    #[serde(default)]
    pub processed_bytes: u64,
}

impl StatementStats {
    /// Fold a newer page's statistics into this accumulated view.
    ///
    /// Snapshot fields (state, flags, split gauges) take the newer value;
    /// cumulative counters never go backwards.
    pub fn merge_from(&mut self, newer: &StatementStats) {
        self.state = newer.state.clone();
        self.queued = newer.queued;
        self.scheduled = newer.scheduled;
        self.nodes = newer.nodes;
        self.total_splits = self.total_splits.max(newer.total_splits);
        self.queued_splits = newer.queued_splits;
        self.running_splits = newer.running_splits;
        self.completed_splits = self.completed_splits.max(newer.completed_splits);
        self.cpu_time_millis = self.cpu_time_millis.max(newer.cpu_time_millis);
        self.wall_time_millis = self.wall_time_millis.max(newer.wall_time_millis);
        self.processed_rows = self.processed_rows.max(newer.processed_rows);
        self.processed_bytes = self.processed_bytes.max(newer.processed_bytes);
    }
}
