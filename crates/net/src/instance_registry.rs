//! Explicit registry of the active adapter instance per room.
//!
//! Host applications register the adapter they create on startup and clear it
//! on teardown. Registering a second instance for the same room hands back the
//! stale one so the caller can shut it down (hot reload, reconnect).

use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Identity of a live adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInstance {
    /// Process-unique adapter id.
    pub instance_id: u64,
    /// Local peer id reported by the transport.
    pub local_id: String,
}

/// At most one active instance per room.
#[derive(Debug)]
pub struct InstanceRegistry<T> {
    active: BTreeMap<String, T>,
}

impl<T> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self {
            active: BTreeMap::new(),
        }
    }
}

impl<T> InstanceRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `instance` the active one for `room`, returning the one it replaced.
    pub fn register(&mut self, room: &str, instance: T) -> Option<T> {
        let stale = self.active.insert(room.to_string(), instance);
        if stale.is_some() {
            debug!(room, "replaced stale sync instance");
        }
        stale
    }

    /// Active instance for `room`.
    pub fn get_active(&self, room: &str) -> Option<&T> {
        self.active.get(room)
    }

    /// Remove the active instance for `room`.
    pub fn clear(&mut self, room: &str) -> Option<T> {
        self.active.remove(room)
    }

    /// Remove every active instance.
    pub fn clear_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.active).into_values().collect()
    }

    /// Get number of rooms with an active instance.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if no room has an active instance.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Process-wide registry.
pub fn global() -> &'static Mutex<InstanceRegistry<ActiveInstance>> {
    static GLOBAL: OnceLock<Mutex<InstanceRegistry<ActiveInstance>>> = OnceLock::new();
    GLOBAL.get_or_init(|| Mutex::new(InstanceRegistry::new()))
}
