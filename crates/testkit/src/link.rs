//! Simulated network link with latency, jitter, loss and reordering.

use entsync_core::Millis;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

struct InFlight<T> {
    arrival: Millis,
    seq: u64,
    payload: T,
}

/// One-way link delivering payloads after a randomized delay.
///
/// Seeded, so a scenario replays identically. Jitter larger than the send
/// cadence reorders deliveries.
pub struct JitterLink<T> {
    rng: StdRng,
    latency_ms: Millis,
    jitter_ms: Millis,
    loss: f64,
    next_seq: u64,
    in_flight: Vec<InFlight<T>>,
    dropped: u64,
}

impl<T> JitterLink<T> {
    /// Link with fixed `latency_ms` plus uniform jitter in `[0, jitter_ms]`.
    pub fn new(seed: u64, latency_ms: Millis, jitter_ms: Millis) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            latency_ms: latency_ms.max(0.0),
            jitter_ms: jitter_ms.max(0.0),
            loss: 0.0,
            next_seq: 0,
            in_flight: Vec::new(),
            dropped: 0,
        }
    }

    /// Drop each payload with probability `loss`.
    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = loss.clamp(0.0, 1.0);
        self
    }

    /// Put a payload on the wire at `now`.
    pub fn send(&mut self, payload: T, now: Millis) {
        if self.loss > 0.0 && self.rng.gen_bool(self.loss) {
            self.dropped += 1;
            trace!(at = now, "link dropped payload");
            return;
        }
        let jitter = self.rng.gen_range(0.0..=self.jitter_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.push(InFlight {
            arrival: now + self.latency_ms + jitter,
            seq,
            payload,
        });
    }

    /// Everything that has arrived by `now`, in arrival order.
    pub fn deliver_due(&mut self, now: Millis) -> Vec<T> {
        self.in_flight
            .sort_by(|a, b| a.arrival.total_cmp(&b.arrival).then(a.seq.cmp(&b.seq)));
        let due = self
            .in_flight
            .iter()
            .take_while(|packet| packet.arrival <= now)
            .count();
        self.in_flight
            .drain(..due)
            .map(|packet| packet.payload)
            .collect()
    }

    /// Payloads still travelling.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Payloads lost so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
