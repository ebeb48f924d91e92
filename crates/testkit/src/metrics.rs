//! Metrics reports exported as JSON by sync scenarios.
//!
//! A report pairs the adapter's traffic counters with motion-quality figures
//! measured on the client, so CI can flag regressions in smoothness.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level report for one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetricsReport {
    /// Scenario identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// Overall result
    pub result: TestResult,

    /// Traffic counters
    pub traffic: TrafficMetrics,

    /// Client-side motion quality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionMetrics>,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Scenario passed all validations
    Pass,
    /// Scenario failed
    Fail,
}

/// Host and client traffic counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    /// Records published by the host
    pub publishes: u64,
    /// Host sample ticks skipped as idle
    pub idle_skips: u64,
    /// State changes delivered to the client
    pub states_delivered: u64,
    /// Snapshots buffered by the client
    pub snapshots_ingested: u64,
    /// Updates dropped for unregistered entities
    pub dropped_updates: u64,
}

/// How closely and smoothly the mirror followed the authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionMetrics {
    /// Rendered frames
    pub frames: u64,
    /// Mean distance between mirror and authority
    pub mean_error: f64,
    /// Largest distance between mirror and authority
    pub max_error: f64,
    /// Largest per-frame jump of the mirror
    pub max_frame_step: f64,
}

/// Accumulates motion samples frame by frame.
#[derive(Debug, Clone, Default)]
pub struct MotionTracker {
    frames: u64,
    error_sum: f64,
    max_error: f64,
    max_frame_step: f64,
    last: Option<(f64, f64)>,
}

impl MotionTracker {
    /// Record one frame: where the mirror is and where the authority is.
    pub fn record(&mut self, mirror: (f64, f64), authority: (f64, f64)) {
        let error = distance(mirror, authority);
        self.frames += 1;
        self.error_sum += error;
        self.max_error = self.max_error.max(error);
        if let Some(last) = self.last {
            self.max_frame_step = self.max_frame_step.max(distance(last, mirror));
        }
        self.last = Some(mirror);
    }

    /// Summarize the recorded frames.
    pub fn finish(&self) -> MotionMetrics {
        MotionMetrics {
            frames: self.frames,
            mean_error: if self.frames == 0 {
                0.0
            } else {
                self.error_sum / self.frames as f64
            },
            max_error: self.max_error,
            max_frame_step: self.max_frame_step,
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

impl SyncMetricsReport {
    /// Start a passing report stamped with the current time.
    pub fn new(test_name: impl Into<String>, traffic: TrafficMetrics) -> Self {
        Self {
            test_name: test_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            result: TestResult::Pass,
            traffic,
            motion: None,
        }
    }

    /// Attach motion metrics
    pub fn with_motion(mut self, motion: MotionMetrics) -> Self {
        self.motion = Some(motion);
        self
    }

    /// Set test result
    pub fn with_result(mut self, result: TestResult) -> Self {
        self.result = result;
        self
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &SyncMetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
