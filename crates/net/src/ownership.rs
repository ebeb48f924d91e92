//! Who owns each entity key on this peer.

use std::collections::HashMap;

/// Ownership of one entity key from the local peer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// This peer publishes the entity.
    LocalAuthoritative,
    /// This peer mirrors the entity from shared state.
    RemoteMirrored,
    /// Nothing registered; updates are dropped.
    Unregistered,
}

/// Single lookup deciding how the ingest pass treats a key.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owners: HashMap<String, Ownership>,
}

impl OwnershipMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ownership of `key`.
    pub fn lookup(&self, key: &str) -> Ownership {
        self.owners
            .get(key)
            .copied()
            .unwrap_or(Ownership::Unregistered)
    }

    /// Mark `key` as published by this peer. Returns the previous ownership.
    pub fn claim_local(&mut self, key: &str) -> Ownership {
        self.set(key, Ownership::LocalAuthoritative)
    }

    /// Mark `key` as mirrored. Returns the previous ownership.
    pub fn claim_remote(&mut self, key: &str) -> Ownership {
        self.set(key, Ownership::RemoteMirrored)
    }

    /// Forget `key`. Returns the previous ownership.
    pub fn release(&mut self, key: &str) -> Ownership {
        self.owners
            .remove(key)
            .unwrap_or(Ownership::Unregistered)
    }

    fn set(&mut self, key: &str, ownership: Ownership) -> Ownership {
        self.owners
            .insert(key.to_string(), ownership)
            .unwrap_or(Ownership::Unregistered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_are_unregistered() {
        let map = OwnershipMap::new();
        assert_eq!(map.lookup("ghost"), Ownership::Unregistered);
    }

    #[test]
    fn test_claims_replace_each_other() {
        let mut map = OwnershipMap::new();
        assert_eq!(map.claim_remote("p1"), Ownership::Unregistered);
        assert_eq!(map.claim_local("p1"), Ownership::RemoteMirrored);
        assert_eq!(map.lookup("p1"), Ownership::LocalAuthoritative);

        assert_eq!(map.release("p1"), Ownership::LocalAuthoritative);
        assert_eq!(map.lookup("p1"), Ownership::Unregistered);
        assert_eq!(map.release("p1"), Ownership::Unregistered);
    }
}
