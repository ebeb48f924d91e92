//! Per-entity snapshot history and the timing math sized from it.
//!
//! Snapshots are stamped with the local receive time. The interval between
//! consecutive snapshots is smoothed with an exponential moving average, and
//! that estimate decides how many intervals the renderer lags behind "now" and
//! therefore how many snapshots the history must retain.

use entsync_core::Millis;
use std::collections::VecDeque;

/// Weight given to each new interval measurement.
pub const SMOOTHING_FACTOR: f64 = 0.2;

/// Upper bound on the computed delay, keeping histories bounded when the
/// measured interval collapses toward zero.
pub const MAX_DELAY_INTERVALS: u32 = 32;

/// One timestamped sample of an entity's interpolatable fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Local receive time.
    pub timestamp: Millis,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Rotation, when the host publishes it.
    pub rotation: Option<f64>,
}

/// Ordered, front-trimmed history of snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<Snapshot>,
}

impl SnapshotBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot.
    ///
    /// Timestamps never go backwards: a snapshot stamped earlier than the
    /// latest one is re-stamped to the latest timestamp.
    pub fn push(&mut self, mut snapshot: Snapshot) {
        if let Some(latest) = self.snapshots.back() {
            if snapshot.timestamp < latest.timestamp {
                snapshot.timestamp = latest.timestamp;
            }
        }
        self.snapshots.push_back(snapshot);
    }

    /// Delta between the two most recent timestamps.
    pub fn last_delta(&self) -> Option<Millis> {
        let len = self.snapshots.len();
        if len < 2 {
            return None;
        }
        Some(self.snapshots[len - 1].timestamp - self.snapshots[len - 2].timestamp)
    }

    /// Drop the oldest snapshots until at most `len` remain.
    pub fn trim_to(&mut self, len: usize) {
        while self.snapshots.len() > len {
            self.snapshots.pop_front();
        }
    }

    /// Snapshot at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Get the most recent snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Get the oldest snapshot.
    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Get number of snapshots stored.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Exponential moving average of the inter-snapshot interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalSmoother {
    estimate: Option<Millis>,
}

impl IntervalSmoother {
    /// Fold one measured interval in and return the new estimate.
    ///
    /// The first measurement seeds the estimate directly.
    pub fn fold(&mut self, measured: Millis) -> Millis {
        let next = match self.estimate {
            Some(smoothed) => smoothed * (1.0 - SMOOTHING_FACTOR) + measured * SMOOTHING_FACTOR,
            None => measured,
        };
        self.estimate = Some(next);
        next
    }

    /// Current estimate, if any interval has been measured.
    pub fn estimate(&self) -> Option<Millis> {
        self.estimate
    }
}

/// How far behind "now" the renderer lags, expressed in snapshot intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayPolicy {
    /// Target lag in milliseconds.
    pub target_render_delay_ms: Millis,
    /// Explicit interval count replacing the computed one.
    pub override_intervals: Option<u32>,
}

impl DelayPolicy {
    /// Number of intervals to lag given the smoothed interval.
    pub fn delay_intervals(&self, smoothed_interval: Millis) -> u32 {
        if let Some(intervals) = self.override_intervals {
            return intervals.max(1);
        }
        if smoothed_interval <= 0.0 || !smoothed_interval.is_finite() {
            return MAX_DELAY_INTERVALS;
        }
        let intervals = (self.target_render_delay_ms / smoothed_interval).ceil();
        (intervals as u32).clamp(1, MAX_DELAY_INTERVALS)
    }
}

/// Snapshots needed to bracket a render instant `delay_intervals` behind now.
pub fn required_buffer_len(delay_intervals: u32) -> usize {
    delay_intervals as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(timestamp: Millis, x: f64) -> Snapshot {
        Snapshot {
            timestamp,
            x,
            y: 0.0,
            rotation: None,
        }
    }

    fn policy(target: Millis) -> DelayPolicy {
        DelayPolicy {
            target_render_delay_ms: target,
            override_intervals: None,
        }
    }

    #[test]
    fn test_push_keeps_timestamps_non_decreasing() {
        let mut buffer = SnapshotBuffer::new();
        buffer.push(snap(100.0, 0.0));
        buffer.push(snap(90.0, 1.0));

        assert_eq!(buffer.latest().unwrap().timestamp, 100.0);
        assert_eq!(buffer.latest().unwrap().x, 1.0);
        assert_eq!(buffer.last_delta(), Some(0.0));
    }

    #[test]
    fn test_trim_keeps_newest() {
        let mut buffer = SnapshotBuffer::new();
        for i in 0..5 {
            buffer.push(snap(i as f64 * 10.0, i as f64));
        }
        buffer.trim_to(2);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.oldest().unwrap().x, 3.0);
        assert_eq!(buffer.latest().unwrap().x, 4.0);
    }

    #[test]
    fn test_smoother_seeds_with_first_measurement() {
        let mut smoother = IntervalSmoother::default();
        assert_eq!(smoother.estimate(), None);
        assert_eq!(smoother.fold(40.0), 40.0);
        // 40 * 0.8 + 90 * 0.2
        assert!((smoother.fold(90.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoother_converges_to_constant_interval() {
        let mut smoother = IntervalSmoother::default();
        smoother.fold(200.0);
        for _ in 0..40 {
            smoother.fold(16.0);
        }
        assert!((smoother.estimate().unwrap() - 16.0).abs() < 0.05);
    }

    #[test]
    fn test_delay_intervals_cover_target() {
        assert_eq!(policy(50.0).delay_intervals(16.0), 4);
        assert_eq!(policy(50.0).delay_intervals(50.0), 1);
        assert_eq!(policy(50.0).delay_intervals(100.0), 1);
        assert_eq!(policy(50.0).delay_intervals(0.0), MAX_DELAY_INTERVALS);
        assert_eq!(policy(50.0).delay_intervals(0.01), MAX_DELAY_INTERVALS);
    }

    #[test]
    fn test_delay_override_wins() {
        let fixed = DelayPolicy {
            target_render_delay_ms: 50.0,
            override_intervals: Some(3),
        };
        assert_eq!(fixed.delay_intervals(1.0), 3);

        let zero = DelayPolicy {
            override_intervals: Some(0),
            ..fixed
        };
        assert_eq!(zero.delay_intervals(1.0), 1);
    }

    #[test]
    fn test_required_buffer_len() {
        assert_eq!(required_buffer_len(1), 2);
        assert_eq!(required_buffer_len(4), 5);
    }
}
