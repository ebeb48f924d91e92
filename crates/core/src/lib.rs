#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod object;
pub mod role;
pub mod state;

use std::time::Instant;
use thiserror::Error;

// Re-export commonly used types
pub use object::{fields, shared, SharedObject, Sprite, VisualObject};
pub use role::{FixedRole, PeerRole};
pub use state::{Record, StateTree};

/// Wall-clock instant in milliseconds.
///
/// Only differences between two values are meaningful; the epoch is whatever
/// the [`Clock`] producing them started at.
pub type Millis = f64;

/// Source of "now" for the host sampling loop and the client renderer.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock reading zero right now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Errors raised by the shared state tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Path was empty or contained an empty segment.
    #[error("invalid state path {0:?}")]
    InvalidPath(String),
    /// A path segment exists but holds something other than an object.
    #[error("state path {path:?} is blocked by non-object value at {segment:?}")]
    NotAnObject {
        /// Full path being resolved.
        path: String,
        /// Segment holding the non-object value.
        segment: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
