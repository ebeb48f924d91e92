#![warn(missing_docs)]
//! Deterministic testing surfaces for sync scenarios (clock, lossy link, traces).

mod link;
mod metrics;

use anyhow::{Context, Result};
use entsync_core::{Clock, Millis};
use serde::Serialize;
use std::cell::Cell;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use link::*;
pub use metrics::*;

/// Clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    /// Clock reading `start`.
    pub fn starting_at(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move forward by `delta` milliseconds and return the new time.
    pub fn advance(&self, delta: Millis) -> Millis {
        let next = self.now.get() + delta;
        self.now.set(next);
        next
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// One line of a sync trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent<'a> {
    /// Scenario time in milliseconds.
    pub at_ms: Millis,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Entity key the event concerns.
    pub key: &'a str,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct TraceSink {
    file: File,
}

impl TraceSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create trace {}", path.display()))?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &TraceEvent<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}
