//! Snapshot-buffer interpolation for remote entities.
//!
//! The renderer samples each history at a render time set a few snapshot
//! intervals behind now, so two real snapshots normally bracket it. Outside
//! the buffered window the nearest pair is clamped rather than extrapolated.

use crate::ingest::RemoteBinding;
use crate::snapshot::{Snapshot, SnapshotBuffer};
use entsync_core::Millis;

/// Interpolated position and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Rotation, when both bracketing snapshots carry one.
    pub rotation: Option<f64>,
}

/// Instant the renderer samples at.
pub fn render_time(now: Millis, delay_intervals: u32, smoothed_interval: Millis) -> Millis {
    now - delay_intervals as f64 * smoothed_interval
}

/// Adjacent pair bracketing `render_time`, clamped to the first or last pair.
pub fn bracket(history: &SnapshotBuffer, render_time: Millis) -> Option<(Snapshot, Snapshot)> {
    let len = history.len();
    if len < 2 {
        return None;
    }
    let first = *history.get(0)?;
    let last = *history.get(len - 1)?;
    if render_time <= first.timestamp {
        return Some((first, *history.get(1)?));
    }
    if render_time >= last.timestamp {
        return Some((*history.get(len - 2)?, last));
    }
    (0..len - 1).find_map(|i| {
        let s0 = *history.get(i)?;
        let s1 = *history.get(i + 1)?;
        (s0.timestamp <= render_time && render_time <= s1.timestamp).then_some((s0, s1))
    })
}

/// Position of `render_time` between `s0` and `s1`, in `[0, 1]`.
///
/// A zero or negative span resolves fully to `s1`.
pub fn interpolation_fraction(s0: &Snapshot, s1: &Snapshot, render_time: Millis) -> f64 {
    let span = s1.timestamp - s0.timestamp;
    if span <= 0.0 {
        return 1.0;
    }
    ((render_time - s0.timestamp) / span).clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Sample a history at `render_time`.
pub fn sample_at(history: &SnapshotBuffer, render_time: Millis) -> Option<Pose> {
    let (s0, s1) = bracket(history, render_time)?;
    let t = interpolation_fraction(&s0, &s1, render_time);
    let rotation = match (s0.rotation, s1.rotation) {
        (Some(r0), Some(r1)) => Some(lerp(r0, r1, t)),
        _ => None,
    };
    Some(Pose {
        x: lerp(s0.x, s1.x, t),
        y: lerp(s0.y, s1.y, t),
        rotation,
    })
}

/// Compute and write one frame for a binding. Returns the pose written.
pub fn render_binding(binding: &RemoteBinding, now: Millis) -> Option<Pose> {
    let history = binding.history();
    if history.len() < 2 {
        return None;
    }
    let smoothed = binding.smoothed_interval()?;
    let at = render_time(now, binding.delay_intervals(), smoothed);
    let pose = sample_at(history, at)?;

    let mut object = binding.object().borrow_mut();
    object.set_position(pose.x, pose.y);
    if let Some(rotation) = pose.rotation {
        object.set_rotation(rotation);
    }
    Some(pose)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(timestamp: Millis, x: f64, rotation: Option<f64>) -> Snapshot {
        Snapshot {
            timestamp,
            x,
            y: 0.0,
            rotation,
        }
    }

    fn pair() -> SnapshotBuffer {
        let mut history = SnapshotBuffer::new();
        history.push(snap(1000.0, 0.0, None));
        history.push(snap(1100.0, 100.0, None));
        history
    }

    #[test]
    fn test_midpoint() {
        let pose = sample_at(&pair(), 1050.0).unwrap();
        assert_eq!(pose.x, 50.0);
        assert_eq!(pose.y, 0.0);
        assert_eq!(pose.rotation, None);
    }

    #[test]
    fn test_clamps_before_earliest() {
        let pose = sample_at(&pair(), 900.0).unwrap();
        assert_eq!((pose.x, pose.y), (0.0, 0.0));
    }

    #[test]
    fn test_clamps_after_latest() {
        let pose = sample_at(&pair(), 1200.0).unwrap();
        assert_eq!((pose.x, pose.y), (100.0, 0.0));
    }

    #[test]
    fn test_finds_inner_pair() {
        let mut history = pair();
        history.push(snap(1200.0, 300.0, None));

        let (s0, s1) = bracket(&history, 1150.0).unwrap();
        assert_eq!((s0.timestamp, s1.timestamp), (1100.0, 1200.0));
        assert_eq!(sample_at(&history, 1150.0).unwrap().x, 200.0);
    }

    #[test]
    fn test_zero_span_resolves_to_newer() {
        let a = snap(1000.0, 0.0, None);
        let b = snap(1000.0, 10.0, None);
        assert_eq!(interpolation_fraction(&a, &b, 1000.0), 1.0);

        let mut history = SnapshotBuffer::new();
        history.push(a);
        history.push(b);
        let pose = sample_at(&history, 1000.0).unwrap();
        assert_eq!(pose.x, 10.0);
        assert!(pose.x.is_finite());
    }

    #[test]
    fn test_rotation_needs_both_ends() {
        let mut history = SnapshotBuffer::new();
        history.push(snap(0.0, 0.0, Some(0.0)));
        history.push(snap(100.0, 0.0, Some(1.0)));
        assert_eq!(sample_at(&history, 25.0).unwrap().rotation, Some(0.25));

        history.push(snap(200.0, 0.0, None));
        assert_eq!(sample_at(&history, 150.0).unwrap().rotation, None);
    }

    #[test]
    fn test_underflow_yields_nothing() {
        let mut history = SnapshotBuffer::new();
        assert!(sample_at(&history, 0.0).is_none());
        history.push(snap(0.0, 1.0, None));
        assert!(sample_at(&history, 0.0).is_none());
    }

    #[test]
    fn test_render_time_offset() {
        assert_eq!(render_time(1150.0, 1, 100.0), 1050.0);
        assert_eq!(render_time(1000.0, 4, 16.0), 936.0);
    }
}
