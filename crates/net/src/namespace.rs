//! Registry of state paths that hold entity collections.

use crate::error::SyncError;
use entsync_core::state::split_path;
use std::collections::BTreeSet;

/// Set of namespaces scanned on every state change.
///
/// Uses BTreeSet so the ingest pass visits namespaces in a stable order.
/// Membership only grows.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    default_namespace: String,
    namespaces: BTreeSet<String>,
}

/// Reject empty paths and paths with empty segments.
pub fn validate_namespace(path: &str) -> Result<(), SyncError> {
    split_path(path)
        .map(|_| ())
        .map_err(|_| SyncError::InvalidNamespace(path.to_string()))
}

impl NamespaceRegistry {
    /// Create a registry seeded with the default namespace.
    pub fn new(default_namespace: &str) -> Result<Self, SyncError> {
        validate_namespace(default_namespace)?;
        let mut namespaces = BTreeSet::new();
        namespaces.insert(default_namespace.to_string());
        Ok(Self {
            default_namespace: default_namespace.to_string(),
            namespaces,
        })
    }

    /// Add a namespace. Returns `true` if it was not registered before.
    pub fn register(&mut self, path: &str) -> Result<bool, SyncError> {
        validate_namespace(path)?;
        if self.namespaces.contains(path) {
            return Ok(false);
        }
        Ok(self.namespaces.insert(path.to_string()))
    }

    /// Namespace used when callers do not name one.
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Check membership.
    pub fn contains(&self, path: &str) -> bool {
        self.namespaces.contains(path)
    }

    /// Iterate all namespaces in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    /// Get number of registered namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Always false: the default namespace is permanent.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
