use anyhow::{Context, Result};
use entsync_core::{shared, Clock, FixedRole, Millis, Sprite, StateTree, VisualObject};
use entsync_net::{global_instances, MemoryStateStore, StateStore, SyncAdapter, SyncConfig};
use entsync_testkit::{
    JitterLink, ManualClock, MotionTracker, SyncMetricsReport, TestResult, TraceEvent, TraceSink,
    TrafficMetrics,
};
use serde_json::json;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

const ROOM: &str = "headless";
const STEP_MS: Millis = 4.0;
const FRAME_MS: Millis = 1000.0 / 60.0;
const RUNNER: &str = "runner";
const CRATE: &str = "crate";

pub struct HeadlessConfig {
    pub sync: SyncConfig,
    pub seconds: f64,
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub loss: f64,
    pub seed: u64,
    pub trace: Option<PathBuf>,
}

/// Runner path: a circle of radius 200 every four seconds, hopping along the way.
fn runner_position(t: Millis) -> (f64, f64, bool) {
    let phase = t / 4000.0 * std::f64::consts::TAU;
    let hop = ((t / 600.0).fract() * std::f64::consts::PI).sin() * 30.0;
    let grounded = hop < 1.0;
    (400.0 + 200.0 * phase.cos(), 300.0 + 200.0 * phase.sin() - hop, grounded)
}

pub fn run(cfg: HeadlessConfig) -> Result<SyncMetricsReport> {
    let clock = ManualClock::starting_at(0.0);
    let host_store = MemoryStateStore::new();
    let client_store = MemoryStateStore::new();
    let wire = host_store.subscribe();
    let mut link: JitterLink<Rc<StateTree>> =
        JitterLink::new(cfg.seed, cfg.latency_ms, cfg.jitter_ms).with_loss(cfg.loss);

    let mut host = SyncAdapter::new(
        Box::new(FixedRole::host("host")),
        Rc::new(host_store.clone()),
        cfg.sync.clone(),
    )
    .context("failed to create host adapter")?;
    let mut client = SyncAdapter::new(
        Box::new(FixedRole::client("guest")),
        Rc::new(client_store.clone()),
        cfg.sync.clone(),
    )
    .context("failed to create client adapter")?;

    if let Some(stale) = global_instances()
        .lock()
        .map_err(|_| anyhow::anyhow!("instance registry poisoned"))?
        .register(ROOM, client.active_instance())
    {
        debug!(instance_id = stale.instance_id, "replacing stale instance");
    }

    let mut trace = cfg.trace.as_ref().map(TraceSink::create).transpose()?;

    // Host side: one moving platformer and one idle prop with static metadata.
    let (x, y, grounded) = runner_position(0.0);
    let runner = shared(Sprite {
        on_ground: Some(grounded),
        ..Sprite::at(x, y)
    });
    let prop = shared(Sprite::at(120.0, 480.0));
    host.set_static_data(
        CRATE,
        json!({"kind": "crate"}).as_object().cloned().unwrap_or_default(),
        None,
    )?;
    host.track(RUNNER, runner.clone(), host.default_track_options().platformer())?;
    host.track(CRATE, prop, host.default_track_options().adaptive(cfg.sync.adaptive_sync_threshold))?;

    // Client side: mirrors for both.
    let runner_mirror = shared(Sprite::default());
    let crate_mirror = shared(Sprite::default());
    client.register_remote(RUNNER, runner_mirror.clone(), None)?;
    client.register_remote(CRATE, crate_mirror.clone(), None)?;

    let mut motion = MotionTracker::default();
    let mut states_delivered = 0u64;
    let mut next_frame = 0.0;
    let end = cfg.seconds * 1000.0;

    while clock.now_ms() < end {
        let now = clock.advance(STEP_MS);

        {
            let (x, y, grounded) = runner_position(now);
            let mut sprite = runner.borrow_mut();
            sprite.set_position(x, y);
            sprite.on_ground = Some(grounded);
        }
        host.update(now);

        for state in wire.drain() {
            link.send(state, now);
        }
        for state in link.deliver_due(now) {
            client_store.replace((*state).clone());
            states_delivered += 1;
        }
        client.pump(now);

        if now >= next_frame {
            next_frame += FRAME_MS;
            client.render_frame(now);
            let mirror = runner_mirror.borrow();
            let (ax, ay, _) = runner_position(now);
            motion.record((mirror.x, mirror.y), (ax, ay));
            if let Some(sink) = trace.as_mut() {
                sink.write(&TraceEvent {
                    at_ms: now,
                    kind: "render",
                    key: RUNNER,
                    x: mirror.x,
                    y: mirror.y,
                })?;
            }
        }
    }

    let kind_synced = crate_mirror.borrow().read("kind") == Some(json!("crate"));
    host.shutdown();
    client.shutdown();
    if let Ok(mut registry) = global_instances().lock() {
        registry.clear(ROOM);
    }

    let host_metrics = host.metrics();
    let client_metrics = client.metrics();
    let traffic = TrafficMetrics {
        publishes: host_metrics.publishes,
        idle_skips: host_metrics.idle_skips,
        states_delivered,
        snapshots_ingested: client_metrics.snapshots_ingested,
        dropped_updates: client_metrics.dropped_updates,
    };
    let motion = motion.finish();
    let passed = kind_synced && motion.frames > 0 && motion.max_error.is_finite();
    info!(
        frames = motion.frames,
        mean_error = motion.mean_error,
        max_frame_step = motion.max_frame_step,
        "headless run complete"
    );

    Ok(SyncMetricsReport::new("headless", traffic)
        .with_motion(motion)
        .with_result(if passed { TestResult::Pass } else { TestResult::Fail }))
}
