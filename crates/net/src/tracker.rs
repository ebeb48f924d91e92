//! Host-side outbound tracking.
//!
//! Samples locally authoritative objects on a fixed cadence and produces the
//! record merges the adapter writes into shared state.

use crate::config::SyncConfig;
use crate::metrics::SyncMetrics;
use entsync_core::{Millis, Record, SharedObject, StateTree};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// How the tracker reads discrete signals off an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MotionProfile {
    /// Position only.
    #[default]
    Free,
    /// Also watches the grounded signal; landing forces a publish.
    Platformer,
}

/// Per-entity tracking options.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOptions {
    /// Sampling cadence used when this entity starts the loop.
    pub sync_interval_ms: Millis,
    /// Skip publishing while the entity is idle.
    pub adaptive_sync: bool,
    /// Per-axis movement below which the entity counts as idle.
    pub adaptive_sync_threshold: f64,
    /// Properties read off the object each publish.
    pub properties: Vec<String>,
    /// Collection the record is written to; adapter default when `None`.
    pub namespace: Option<String>,
    /// Discrete signals to watch.
    pub motion: MotionProfile,
}

impl TrackOptions {
    /// Options derived from adapter-wide config.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            sync_interval_ms: config.sync_interval_ms,
            adaptive_sync: config.adaptive_sync,
            adaptive_sync_threshold: config.adaptive_sync_threshold,
            properties: config.sync_properties.clone(),
            namespace: None,
            motion: MotionProfile::Free,
        }
    }

    /// Write into `namespace` instead of the default.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Enable idle skipping with the given threshold.
    pub fn adaptive(mut self, threshold: f64) -> Self {
        self.adaptive_sync = true;
        self.adaptive_sync_threshold = threshold;
        self
    }

    /// Force a publish whenever the object lands.
    pub fn platformer(mut self) -> Self {
        self.motion = MotionProfile::Platformer;
        self
    }
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// A locally authoritative object being published.
pub struct TrackedEntity {
    object: SharedObject,
    options: TrackOptions,
    namespace: String,
    last_published: Option<(f64, f64)>,
    last_grounded: Option<bool>,
}

impl TrackedEntity {
    /// Wrap an object; `namespace` is the resolved collection path.
    pub fn new(object: SharedObject, options: TrackOptions, namespace: String) -> Self {
        Self {
            object,
            options,
            namespace,
            last_published: None,
            last_grounded: None,
        }
    }

    /// The tracked object.
    pub fn object(&self) -> &SharedObject {
        &self.object
    }

    /// Collection the record lives in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Tracking options.
    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// Position at the last publish.
    pub fn last_published(&self) -> Option<(f64, f64)> {
        self.last_published
    }

    fn decide(&mut self) -> SampleDecision {
        let object = self.object.borrow();
        let position = object.position();
        let grounded = match self.options.motion {
            MotionProfile::Platformer => object.grounded(),
            MotionProfile::Free => None,
        };
        drop(object);

        let landed = matches!((self.last_grounded, grounded), (Some(false), Some(true)));
        if grounded.is_some() {
            self.last_grounded = grounded;
        }
        if landed {
            return SampleDecision::Publish { forced: true };
        }

        if self.options.adaptive_sync {
            if let (Some((lx, ly)), Some((x, y))) = (self.last_published, position) {
                let threshold = self.options.adaptive_sync_threshold;
                if (x - lx).abs() < threshold && (y - ly).abs() < threshold {
                    return SampleDecision::SkipIdle;
                }
            }
        }
        SampleDecision::Publish { forced: false }
    }

    fn sample(&mut self, key: &str) -> Publish {
        let object = self.object.borrow();
        let mut fields = Record::new();
        for property in &self.options.properties {
            if let Some(value) = object.read(property) {
                fields.insert(property.clone(), value);
            }
        }
        self.last_published = object.position();
        Publish {
            namespace: self.namespace.clone(),
            key: key.to_string(),
            fields,
        }
    }
}

/// Outcome of one sample tick for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    /// Write the sampled properties.
    Publish {
        /// A discrete transition overrode idle skipping.
        forced: bool,
    },
    /// Entity is idle; nothing written.
    SkipIdle,
}

/// Sampled properties for one entity, ready to merge into shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    /// Collection path.
    pub namespace: String,
    /// Entity key.
    pub key: String,
    /// Sampled properties.
    pub fields: Record,
}

/// Fixed-cadence timer advanced by the host's update call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingLoop {
    interval_ms: Millis,
    next_due: Option<Millis>,
}

impl SamplingLoop {
    /// Create a timer; it anchors on the first poll.
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            interval_ms: interval_ms.max(1.0),
            next_due: None,
        }
    }

    /// Sampling cadence.
    pub fn interval_ms(&self) -> Millis {
        self.interval_ms
    }

    /// Returns true when a sample tick is due at `now`.
    ///
    /// Fires at most once per call; a timer that fell far behind resumes one
    /// interval after `now` rather than firing a burst.
    pub fn poll(&mut self, now: Millis) -> bool {
        let Some(due) = self.next_due else {
            self.next_due = Some(now + self.interval_ms);
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.interval_ms;
        if next <= now {
            next = now + self.interval_ms;
        }
        self.next_due = Some(next);
        true
    }
}

/// All entities this peer publishes, plus the shared sampling loop.
///
/// BTreeMap keeps publish order stable across ticks.
#[derive(Default)]
pub struct OutboundTracker {
    entities: BTreeMap<String, TrackedEntity>,
    sampling: Option<SamplingLoop>,
}

impl OutboundTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking, replacing any entity under the same key.
    ///
    /// Starts the sampling loop if it is not running.
    pub fn insert(&mut self, key: &str, entity: TrackedEntity) -> Option<TrackedEntity> {
        if self.sampling.is_none() {
            self.sampling = Some(SamplingLoop::new(entity.options.sync_interval_ms));
        }
        self.entities.insert(key.to_string(), entity)
    }

    /// Stop tracking; stops the sampling loop when nothing is left.
    pub fn remove(&mut self, key: &str) -> Option<TrackedEntity> {
        let removed = self.entities.remove(key);
        if self.entities.is_empty() {
            self.sampling = None;
        }
        removed
    }

    /// Look up a tracked entity.
    pub fn get(&self, key: &str) -> Option<&TrackedEntity> {
        self.entities.get(key)
    }

    /// Check whether `key` is tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    /// Tracked keys in publish order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Get number of tracked entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether the sampling loop is running.
    pub fn is_sampling(&self) -> bool {
        self.sampling.is_some()
    }

    /// Advance the sampling loop; true when a sample tick is due.
    pub fn sample_due(&mut self, now: Millis) -> bool {
        match self.sampling.as_mut() {
            Some(sampling) => sampling.poll(now),
            None => false,
        }
    }

    /// Unconditionally sample one entity (the immediate publish on track).
    pub fn sample_now(&mut self, key: &str) -> Option<Publish> {
        let entity = self.entities.get_mut(key)?;
        Some(entity.sample(key))
    }

    /// Run one sample tick over every tracked entity.
    pub fn sample_tick(&mut self, metrics: &mut SyncMetrics) -> Vec<Publish> {
        let mut publishes = Vec::new();
        for (key, entity) in self.entities.iter_mut() {
            match entity.decide() {
                SampleDecision::SkipIdle => {
                    metrics.idle_skips += 1;
                    trace!(key = %key, "idle, skipping publish");
                }
                SampleDecision::Publish { forced } => {
                    if forced {
                        metrics.forced_flushes += 1;
                        trace!(key = %key, "grounded transition, forcing publish");
                    }
                    publishes.push(entity.sample(key));
                }
            }
        }
        publishes
    }
}

/// Merge sampled properties over the existing record.
pub fn apply_publish(tree: &mut StateTree, publish: &Publish) -> Result<(), entsync_core::CoreError> {
    let collection = tree.collection_mut(&publish.namespace)?;
    let slot = collection
        .entry(publish.key.clone())
        .or_insert_with(|| Value::Object(Record::new()));
    if !slot.is_object() {
        *slot = Value::Object(Record::new());
    }
    if let Value::Object(record) = slot {
        for (field, value) in &publish.fields {
            record.insert(field.clone(), value.clone());
        }
    }
    Ok(())
}

/// Merge static fields under the existing record: fields already present win.
pub fn merge_static(
    tree: &mut StateTree,
    namespace: &str,
    key: &str,
    data: &Record,
) -> Result<(), entsync_core::CoreError> {
    let collection = tree.collection_mut(namespace)?;
    let mut merged = data.clone();
    if let Some(Value::Object(existing)) = collection.get(key) {
        for (field, value) in existing {
            merged.insert(field.clone(), value.clone());
        }
    }
    collection.insert(key.to_string(), Value::Object(merged));
    Ok(())
}
