//! Counters describing sync traffic on one adapter.

use serde::Serialize;

/// Running totals since the adapter was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncMetrics {
    /// Entity records written to shared state by the host.
    pub publishes: u64,
    /// Sample ticks skipped because the entity was idle.
    pub idle_skips: u64,
    /// Publishes forced by a discrete state transition.
    pub forced_flushes: u64,
    /// Snapshots appended to remote histories.
    pub snapshots_ingested: u64,
    /// Records ignored because no binding was registered for the key.
    pub dropped_updates: u64,
    /// Entity positions written by the renderer.
    pub frames_interpolated: u64,
}
