//! Client-side snapshot ingestion into per-entity histories.

use crate::snapshot::{required_buffer_len, DelayPolicy, IntervalSmoother, Snapshot, SnapshotBuffer};
use entsync_core::{fields, Millis, Record, SharedObject, VisualObject};

/// Lifecycle of a remote binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    /// Registered, no snapshot received yet.
    Unseen,
    /// One snapshot received; the object was snapped to it.
    Buffering,
    /// Two or more snapshots; the renderer blends between them.
    Interpolating,
}

/// What one ingest call did to a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First snapshot; object moved straight to it.
    Snapped,
    /// Snapshot appended to the history.
    Buffered,
    /// Record carried no numeric position; only other fields were applied.
    NoPosition,
}

/// A mirrored entity and the history that drives its motion.
pub struct RemoteBinding {
    object: SharedObject,
    namespace: String,
    history: SnapshotBuffer,
    smoother: IntervalSmoother,
    delay_intervals: u32,
    last_seen: Option<Millis>,
    phase: BindingPhase,
}

impl RemoteBinding {
    /// Bind `object` to records under `namespace`.
    pub fn new(object: SharedObject, namespace: String) -> Self {
        Self {
            object,
            namespace,
            history: SnapshotBuffer::new(),
            smoother: IntervalSmoother::default(),
            delay_intervals: 1,
            last_seen: None,
            phase: BindingPhase::Unseen,
        }
    }

    /// The mirrored object.
    pub fn object(&self) -> &SharedObject {
        &self.object
    }

    /// Collection this binding reads from.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Buffered snapshots, oldest first.
    pub fn history(&self) -> &SnapshotBuffer {
        &self.history
    }

    /// Smoothed inter-snapshot interval.
    pub fn smoothed_interval(&self) -> Option<Millis> {
        self.smoother.estimate()
    }

    /// Snapshot intervals the renderer lags behind now.
    pub fn delay_intervals(&self) -> u32 {
        self.delay_intervals
    }

    /// Receive time of the latest snapshot.
    pub fn last_seen(&self) -> Option<Millis> {
        self.last_seen
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> BindingPhase {
        self.phase
    }

    /// Fold one record from shared state into the binding.
    pub fn ingest(&mut self, record: &Record, now: Millis, policy: &DelayPolicy) -> IngestOutcome {
        apply_fields(&mut *self.object.borrow_mut(), record, INTERPOLATED_FIELDS);

        let Some(snapshot) = snapshot_from_record(record, now) else {
            return IngestOutcome::NoPosition;
        };
        self.history.push(snapshot);
        self.last_seen = Some(now);

        if let Some(delta) = self.history.last_delta() {
            // Two updates in the same instant carry no timing information.
            if delta > 0.0 {
                self.smoother.fold(delta);
            }
        }
        if let Some(smoothed) = self.smoother.estimate() {
            self.delay_intervals = policy.delay_intervals(smoothed);
        } else if let Some(intervals) = policy.override_intervals {
            self.delay_intervals = intervals.max(1);
        }
        self.history.trim_to(required_buffer_len(self.delay_intervals));

        match self.phase {
            BindingPhase::Unseen => {
                let mut object = self.object.borrow_mut();
                object.set_position(snapshot.x, snapshot.y);
                if let Some(rotation) = snapshot.rotation {
                    object.set_rotation(rotation);
                }
                self.phase = BindingPhase::Buffering;
                IngestOutcome::Snapped
            }
            _ => {
                if self.history.len() >= 2 {
                    self.phase = BindingPhase::Interpolating;
                }
                IngestOutcome::Buffered
            }
        }
    }

    /// Release the object.
    pub fn release(self) {
        self.object.borrow_mut().destroy();
    }
}

/// Fields owned by the renderer on mirrored objects.
pub const INTERPOLATED_FIELDS: &[&str] = &[fields::X, fields::Y, fields::ROTATION];

/// Build a snapshot from a record; `None` unless `x` and `y` are numeric.
pub fn snapshot_from_record(record: &Record, now: Millis) -> Option<Snapshot> {
    let x = record.get(fields::X)?.as_f64()?;
    let y = record.get(fields::Y)?.as_f64()?;
    let rotation = record.get(fields::ROTATION).and_then(|value| value.as_f64());
    Some(Snapshot {
        timestamp: now,
        x,
        y,
        rotation,
    })
}

/// Write every field of `record` onto `object` except those in `skip`.
pub fn apply_fields(object: &mut dyn VisualObject, record: &Record, skip: &[&str]) {
    for (field, value) in record {
        if skip.contains(&field.as_str()) {
            continue;
        }
        object.write(field, value);
    }
}
