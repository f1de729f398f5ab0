use std::sync::atomic::Ordering;

use super::{MemoryState, Snapshot};

/// Point-in-time statistics of the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub widgets: usize,
    pub snapshot_version: u64,
    pub max_z_order: Option<i32>,
    pub min_z_order: Option<i32>,
    pub next_id: u64,
}

/// Collect statistics from the current snapshot and log them
pub fn collect_metrics(state: &MemoryState) -> StoreStats {
    snapshot_metrics(&state.load(), state.next_id.load(Ordering::SeqCst))
}

/// Collect statistics from `snapshot` paired with the id counter read
/// alongside it, and log them
pub fn snapshot_metrics(snapshot: &Snapshot, next_id: u64) -> StoreStats {
    let stats = StoreStats {
        widgets: snapshot.len(),
        snapshot_version: snapshot.version,
        max_z_order: snapshot.widgets.first().map(|w| w.z_order),
        min_z_order: snapshot.widgets.last().map(|w| w.z_order),
        next_id,
    };

    tracing::info!(
        widgets = stats.widgets,
        snapshot_version = stats.snapshot_version,
        max_z_order = ?stats.max_z_order,
        min_z_order = ?stats.min_z_order,
        next_id = stats.next_id,
        "widget store metrics"
    );

    stats
}
