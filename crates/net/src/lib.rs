#![warn(missing_docs)]
//! Remote entity sync and interpolation.
//!
//! Hosts publish their authoritative objects into shared state; clients buffer
//! the resulting snapshots per entity and render them slightly in the past so
//! two real samples always bracket the displayed position.

mod adapter;
mod config;
mod error;
mod ingest;
mod instance_registry;
mod interpolation;
mod metrics;
mod namespace;
mod ownership;
mod snapshot;
mod store;
mod tracker;

pub use adapter::SyncAdapter;
pub use config::{default_sync_properties, SyncConfig, DEFAULT_NAMESPACE, DEFAULT_SYNC_CONFIG_PATH};
pub use error::SyncError;
pub use ingest::{
    apply_fields, snapshot_from_record, BindingPhase, IngestOutcome, RemoteBinding,
    INTERPOLATED_FIELDS,
};
pub use instance_registry::{global as global_instances, ActiveInstance, InstanceRegistry};
pub use interpolation::{
    bracket, interpolation_fraction, render_binding, render_time, sample_at, Pose,
};
pub use metrics::SyncMetrics;
pub use namespace::{validate_namespace, NamespaceRegistry};
pub use ownership::{Ownership, OwnershipMap};
pub use snapshot::{
    required_buffer_len, DelayPolicy, IntervalSmoother, Snapshot, SnapshotBuffer,
    MAX_DELAY_INTERVALS, SMOOTHING_FACTOR,
};
pub use store::{MemoryStateStore, StateStore, StateSubscription, SubscriberHandle};
pub use tracker::{
    apply_publish, merge_static, MotionProfile, OutboundTracker, Publish, SampleDecision,
    SamplingLoop, TrackOptions, TrackedEntity,
};
