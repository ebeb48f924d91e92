//! Per-peer sync adapter.
//!
//! One adapter owns the outbound tracker (host role), the namespace registry,
//! the remote bindings fed by the ingest pass, and the renderer. Game code can
//! call host-only operations unconditionally: on a client they do nothing.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::ingest::{apply_fields, BindingPhase, IngestOutcome, RemoteBinding};
use crate::instance_registry::ActiveInstance;
use crate::interpolation::render_binding;
use crate::metrics::SyncMetrics;
use crate::namespace::NamespaceRegistry;
use crate::ownership::{Ownership, OwnershipMap};
use crate::snapshot::DelayPolicy;
use crate::store::{StateStore, StateSubscription};
use crate::tracker::{apply_publish, merge_static, OutboundTracker, Publish, TrackOptions, TrackedEntity};
use entsync_core::{Millis, PeerRole, Record, SharedObject, StateTree};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Remote entity sync and interpolation for one peer.
pub struct SyncAdapter {
    instance_id: u64,
    role: Box<dyn PeerRole>,
    store: Rc<dyn StateStore>,
    subscription: StateSubscription,
    config: SyncConfig,
    delay_policy: DelayPolicy,
    namespaces: NamespaceRegistry,
    tracker: OutboundTracker,
    /// BTreeMap keeps render order stable across frames.
    bindings: BTreeMap<String, RemoteBinding>,
    ownership: OwnershipMap,
    metrics: SyncMetrics,
}

impl SyncAdapter {
    /// Create an adapter writing to and subscribed to `store`.
    pub fn new(
        role: Box<dyn PeerRole>,
        store: Rc<dyn StateStore>,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        let namespaces = NamespaceRegistry::new(&config.default_namespace)?;
        let subscription = store.subscribe();
        let delay_policy = DelayPolicy {
            target_render_delay_ms: config.target_render_delay_ms,
            override_intervals: config.interpolation_delay_override,
        };
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            instance_id,
            local_id = role.local_id(),
            host = role.is_host(),
            "sync adapter created"
        );
        Ok(Self {
            instance_id,
            role,
            store,
            subscription,
            config,
            delay_policy,
            namespaces,
            tracker: OutboundTracker::new(),
            bindings: BTreeMap::new(),
            ownership: OwnershipMap::new(),
            metrics: SyncMetrics::default(),
        })
    }

    /// Identity for the process-wide instance registry.
    pub fn active_instance(&self) -> ActiveInstance {
        ActiveInstance {
            instance_id: self.instance_id,
            local_id: self.role.local_id().to_string(),
        }
    }

    /// Whether this peer is authoritative.
    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    /// Adapter-wide config.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Tracking options built from the adapter config.
    pub fn default_track_options(&self) -> TrackOptions {
        TrackOptions::from_config(&self.config)
    }

    // ---------------------------------------------------------------------
    // Namespaces
    // ---------------------------------------------------------------------

    /// Register a collection path to scan. Returns true if it was new.
    pub fn register_namespace(&mut self, path: &str) -> Result<bool, SyncError> {
        let added = self.namespaces.register(path)?;
        if added {
            debug!(namespace = path, "registered namespace");
        }
        Ok(added)
    }

    /// Registered namespaces in scan order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter()
    }

    // ---------------------------------------------------------------------
    // Host role
    // ---------------------------------------------------------------------

    /// Start publishing `object` under `key`. No-op on clients.
    ///
    /// Publishes once before returning, so a `set_static_data` call made just
    /// before is already in the record the first position lands in.
    pub fn track(
        &mut self,
        key: &str,
        object: SharedObject,
        options: TrackOptions,
    ) -> Result<(), SyncError> {
        if !self.role.is_host() {
            debug!(key, "track ignored on non-host peer");
            return Ok(());
        }
        let namespace = options
            .namespace
            .clone()
            .unwrap_or_else(|| self.namespaces.default_namespace().to_string());
        self.register_namespace(&namespace)?;

        if self.ownership.claim_local(key) == Ownership::RemoteMirrored {
            // Authority moved here; the object is no longer a mirror.
            self.bindings.remove(key);
            debug!(key, "dropped remote binding for newly tracked key");
        }
        let mut stale_namespace = None;
        if let Some(previous) = self
            .tracker
            .insert(key, TrackedEntity::new(object, options, namespace.clone()))
        {
            debug!(key, "re-tracking replaced previous entity");
            if previous.namespace() != namespace {
                stale_namespace = Some(previous.namespace().to_string());
            }
        }

        if let Some(publish) = self.tracker.sample_now(key) {
            // Leaving the old namespace and the first publish are one change.
            let stale = stale_namespace.as_deref().map(|ns| (ns, key));
            self.publish(std::slice::from_ref(&publish), stale);
        }
        Ok(())
    }

    /// Stop publishing `key` and delete its record. No-op on clients.
    pub fn untrack(&mut self, key: &str) {
        if !self.role.is_host() {
            debug!(key, "untrack ignored on non-host peer");
            return;
        }
        let Some(entity) = self.tracker.remove(key) else {
            return;
        };
        self.ownership.release(key);
        let namespace = entity.namespace().to_string();
        self.store.mutate(&mut |tree| {
            tree.remove_record(&namespace, key);
        });
        debug!(key, "untracked");
    }

    /// Whether `key` is being published by this peer.
    pub fn is_tracking(&self, key: &str) -> bool {
        self.tracker.contains(key)
    }

    /// Merge static fields into a record; fields already present win.
    ///
    /// The namespace defaults to the tracked entity's, then the adapter default.
    /// No-op on clients.
    pub fn set_static_data(
        &mut self,
        key: &str,
        data: Record,
        namespace: Option<&str>,
    ) -> Result<(), SyncError> {
        if !self.role.is_host() {
            debug!(key, "set_static_data ignored on non-host peer");
            return Ok(());
        }
        let namespace = match namespace {
            Some(namespace) => namespace.to_string(),
            None => match self.tracker.get(key) {
                Some(entity) => entity.namespace().to_string(),
                None => self.namespaces.default_namespace().to_string(),
            },
        };
        self.register_namespace(&namespace)?;

        let mut result = Ok(());
        self.store.mutate(&mut |tree| {
            result = merge_static(tree, &namespace, key, &data);
        });
        result.map_err(SyncError::from)
    }

    /// Host sample driver; call from the application's update loop.
    ///
    /// Also drains the host's own subscription, so a host that never calls
    /// [`pump`](Self::pump) does not accumulate the states it publishes.
    pub fn update(&mut self, now: Millis) {
        if !self.role.is_host() {
            return;
        }
        if self.tracker.sample_due(now) {
            let publishes = self.tracker.sample_tick(&mut self.metrics);
            if !publishes.is_empty() {
                self.publish(&publishes, None);
            }
        }
        self.pump(now);
    }

    /// Write `publishes` in one mutation, removing the `stale` record first.
    fn publish(&mut self, publishes: &[Publish], stale: Option<(&str, &str)>) {
        let mut failures = Vec::new();
        self.store.mutate(&mut |tree| {
            if let Some((namespace, key)) = stale {
                tree.remove_record(namespace, key);
            }
            for publish in publishes {
                if let Err(err) = apply_publish(tree, publish) {
                    failures.push((publish.key.clone(), err));
                }
            }
        });
        self.metrics.publishes += (publishes.len() - failures.len()) as u64;
        for (key, err) in failures {
            warn!(key = %key, "skipped publish: {err}");
        }
    }

    // ---------------------------------------------------------------------
    // Client role
    // ---------------------------------------------------------------------

    /// Mirror records under `key` onto `object`.
    ///
    /// Returns false, leaving everything unchanged, if this peer publishes `key`.
    pub fn register_remote(
        &mut self,
        key: &str,
        object: SharedObject,
        namespace: Option<&str>,
    ) -> Result<bool, SyncError> {
        if self.ownership.lookup(key) == Ownership::LocalAuthoritative {
            warn!(key, "refusing to mirror a locally tracked entity");
            return Ok(false);
        }
        let namespace = namespace
            .unwrap_or_else(|| self.namespaces.default_namespace())
            .to_string();
        self.register_namespace(&namespace)?;

        self.ownership.claim_remote(key);
        if let Some(previous) = self
            .bindings
            .insert(key.to_string(), RemoteBinding::new(object, namespace))
        {
            previous.release();
        }
        debug!(key, "registered remote entity");
        Ok(true)
    }

    /// Drop the binding for `key` and release its object.
    pub fn unregister_remote(&mut self, key: &str) -> bool {
        let Some(binding) = self.bindings.remove(key) else {
            return false;
        };
        self.ownership.release(key);
        binding.release();
        debug!(key, "unregistered remote entity");
        true
    }

    /// Ingest one full state. Called for every state change.
    pub fn apply_state(&mut self, state: &StateTree, now: Millis) {
        for namespace in self.namespaces.iter() {
            let Some(collection) = state.collection(namespace) else {
                continue;
            };
            for (key, value) in collection {
                let Some(record) = value.as_object() else {
                    continue;
                };
                match self.ownership.lookup(key) {
                    Ownership::LocalAuthoritative => {
                        if let Some(entity) = self.tracker.get(key) {
                            if entity.namespace() != namespace {
                                continue;
                            }
                            // Sampled fields flow outward only.
                            let sampled: Vec<&str> =
                                entity.options().properties.iter().map(String::as_str).collect();
                            apply_fields(&mut *entity.object().borrow_mut(), record, &sampled);
                        }
                    }
                    Ownership::RemoteMirrored => {
                        let Some(binding) = self.bindings.get_mut(key) else {
                            continue;
                        };
                        if binding.namespace() != namespace {
                            continue;
                        }
                        match binding.ingest(record, now, &self.delay_policy) {
                            IngestOutcome::Snapped | IngestOutcome::Buffered => {
                                self.metrics.snapshots_ingested += 1;
                            }
                            IngestOutcome::NoPosition => {}
                        }
                    }
                    Ownership::Unregistered => {
                        self.metrics.dropped_updates += 1;
                        trace!(key = %key, namespace, "dropping update for unregistered entity");
                    }
                }
            }
        }
    }

    /// Ingest every state change delivered since the last pump.
    ///
    /// Every drained state is stamped with `now`, so changes that arrive
    /// between two pumps collapse into one instant: the zero deltas are not
    /// folded into the interval estimate and only the latest position counts.
    /// Call it at least as often as changes arrive, or feed each change to
    /// [`apply_state`](Self::apply_state) with its own receive time.
    pub fn pump(&mut self, now: Millis) -> usize {
        let states = self.subscription.drain();
        for state in &states {
            self.apply_state(state, now);
        }
        states.len()
    }

    /// Per-frame renderer step.
    pub fn render_frame(&mut self, now: Millis) {
        for binding in self.bindings.values() {
            if render_binding(binding, now).is_some() {
                self.metrics.frames_interpolated += 1;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Queries and teardown
    // ---------------------------------------------------------------------

    /// Lifecycle phase of a remote binding.
    pub fn binding_phase(&self, key: &str) -> Option<BindingPhase> {
        self.bindings.get(key).map(RemoteBinding::phase)
    }

    /// Number of buffered snapshots for a remote binding.
    pub fn buffered_snapshots(&self, key: &str) -> Option<usize> {
        self.bindings.get(key).map(|binding| binding.history().len())
    }

    /// Smoothed inter-snapshot interval for a remote binding.
    pub fn smoothed_interval(&self, key: &str) -> Option<Millis> {
        self.bindings.get(key)?.smoothed_interval()
    }

    /// Delay interval count for a remote binding.
    pub fn delay_intervals(&self, key: &str) -> Option<u32> {
        self.bindings.get(key).map(RemoteBinding::delay_intervals)
    }

    /// State changes delivered to this adapter but not yet ingested.
    pub fn pending_states(&self) -> usize {
        self.subscription.pending()
    }

    /// Whether a remote binding exists for `key`.
    pub fn is_mirroring(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Traffic counters.
    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Untrack everything this peer publishes and release every mirror.
    pub fn shutdown(&mut self) {
        let tracked: Vec<String> = self.tracker.keys().map(str::to_string).collect();
        for key in tracked {
            self.untrack(&key);
        }
        let mirrored: Vec<String> = self.bindings.keys().cloned().collect();
        for key in mirrored {
            self.unregister_remote(&key);
        }
        debug!(instance_id = self.instance_id, "sync adapter shut down");
    }
}
