//! Role queries supplied by the transport layer.

/// Answers "am I the authority?" and "who am I?" for the local peer.
pub trait PeerRole {
    /// Whether this peer is the host (authoritative for shared state).
    fn is_host(&self) -> bool;

    /// Identifier of the local peer.
    fn local_id(&self) -> &str;
}

/// Role that never changes for the lifetime of the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRole {
    host: bool,
    id: String,
}

impl FixedRole {
    /// Authoritative peer.
    pub fn host(id: impl Into<String>) -> Self {
        Self {
            host: true,
            id: id.into(),
        }
    }

    /// Mirroring peer.
    pub fn client(id: impl Into<String>) -> Self {
        Self {
            host: false,
            id: id.into(),
        }
    }
}

impl PeerRole for FixedRole {
    fn is_host(&self) -> bool {
        self.host
    }

    fn local_id(&self) -> &str {
        &self.id
    }
}
