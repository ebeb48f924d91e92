//! Host-to-client scenarios over a simulated link.

use entsync_core::{shared, Clock, FixedRole, Sprite, StateTree};
use entsync_net::{
    BindingPhase, MemoryStateStore, StateStore, StateSubscription, SyncAdapter, SyncConfig,
    TrackOptions,
};
use entsync_testkit::{JitterLink, ManualClock};
use std::rc::Rc;

const STEP_MS: f64 = 4.0;
const SPEED: f64 = 0.1;

struct Scenario {
    clock: ManualClock,
    host: SyncAdapter,
    client: SyncAdapter,
    client_store: MemoryStateStore,
    wire: StateSubscription,
    link: JitterLink<Rc<StateTree>>,
}

impl Scenario {
    fn new(config: SyncConfig, link: JitterLink<Rc<StateTree>>) -> Self {
        let host_store = MemoryStateStore::new();
        let client_store = MemoryStateStore::new();
        let wire = host_store.subscribe();
        let host = SyncAdapter::new(
            Box::new(FixedRole::host("host")),
            Rc::new(host_store),
            config.clone(),
        )
        .expect("host adapter");
        let client = SyncAdapter::new(
            Box::new(FixedRole::client("guest")),
            Rc::new(client_store.clone()),
            config,
        )
        .expect("client adapter");
        Self {
            clock: ManualClock::starting_at(0.0),
            host,
            client,
            client_store,
            wire,
            link,
        }
    }

    /// Advance one step, moving the link and pumping the client.
    fn step(&mut self) {
        let now = self.clock.advance(STEP_MS);
        self.host.update(now);
        for state in self.wire.drain() {
            self.link.send(state, now);
        }
        for state in self.link.deliver_due(now) {
            self.client_store.replace((*state).clone());
        }
        self.client.pump(now);
        self.client.render_frame(now);
    }
}

#[test]
fn mirror_follows_steady_motion_smoothly() {
    let mut scenario = Scenario::new(SyncConfig::default(), JitterLink::new(3, 50.0, 0.0));
    let authority = shared(Sprite::default());
    let mirror = shared(Sprite::default());
    scenario
        .host
        .track("runner", authority.clone(), TrackOptions::default())
        .unwrap();
    scenario
        .client
        .register_remote("runner", mirror.clone(), None)
        .unwrap();

    let mut previous_x = f64::NEG_INFINITY;
    while scenario.clock.now_ms() < 2000.0 {
        let now = scenario.clock.now_ms() + STEP_MS;
        authority.borrow_mut().x = now * SPEED;
        scenario.step();

        if now > 500.0 {
            let x = mirror.borrow().x;
            assert!(x >= previous_x, "mirror moved backwards at {now}: {x} < {previous_x}");
            assert!(now * SPEED - x < 25.0, "mirror lagged too far at {now}");
            previous_x = x;
        }
    }

    assert_eq!(
        scenario.client.binding_phase("runner"),
        Some(BindingPhase::Interpolating)
    );
    assert_eq!(scenario.client.delay_intervals("runner"), Some(4));
    let smoothed = scenario.client.smoothed_interval("runner").unwrap();
    assert!((smoothed - 16.0).abs() < 0.5);
    assert!(scenario.client.buffered_snapshots("runner").unwrap() <= 5);
}

#[test]
fn jittered_link_never_renders_outside_sampled_path() {
    let mut scenario = Scenario::new(
        SyncConfig::default(),
        JitterLink::new(11, 40.0, 35.0).with_loss(0.1),
    );
    let authority = shared(Sprite::default());
    let mirror = shared(Sprite::default());
    scenario
        .host
        .track("runner", authority.clone(), TrackOptions::default())
        .unwrap();
    scenario
        .client
        .register_remote("runner", mirror.clone(), None)
        .unwrap();

    while scenario.clock.now_ms() < 3000.0 {
        let now = scenario.clock.now_ms() + STEP_MS;
        authority.borrow_mut().x = now * SPEED;
        scenario.step();

        let x = mirror.borrow().x;
        assert!(x.is_finite());
        assert!((0.0..=now * SPEED).contains(&x), "x = {x} at {now}");
    }

    assert!(scenario.link.dropped() > 0);
    assert!(scenario.client.metrics().snapshots_ingested > 0);
}

#[test]
fn static_metadata_reaches_the_mirror() {
    let mut scenario = Scenario::new(SyncConfig::default(), JitterLink::new(5, 20.0, 0.0));
    let mirror = shared(Sprite::default());
    scenario
        .client
        .register_remote("crate", mirror.clone(), Some("props"))
        .unwrap();
    scenario
        .host
        .set_static_data(
            "crate",
            serde_json::json!({"kind": "crate", "alpha": 0.5})
                .as_object()
                .cloned()
                .unwrap(),
            Some("props"),
        )
        .unwrap();
    scenario
        .host
        .track(
            "crate",
            shared(Sprite {
                alpha: 0.8,
                ..Sprite::at(10.0, 20.0)
            }),
            TrackOptions::default().in_namespace("props").adaptive(1.0),
        )
        .unwrap();

    for _ in 0..20 {
        scenario.step();
    }

    let mirror = mirror.borrow();
    assert_eq!(mirror.extra["kind"], serde_json::json!("crate"));
    assert_eq!((mirror.x, mirror.y), (10.0, 20.0));
    // Sampled alpha replaced the static default.
    assert_eq!(mirror.alpha, 0.8);
}

#[test]
fn untracked_entity_stops_updating_mirror() {
    let mut scenario = Scenario::new(SyncConfig::default(), JitterLink::new(9, 0.0, 0.0));
    let authority = shared(Sprite::default());
    let mirror = shared(Sprite::default());
    scenario
        .host
        .track("p1", authority.clone(), TrackOptions::default())
        .unwrap();
    scenario
        .client
        .register_remote("p1", mirror.clone(), None)
        .unwrap();
    for _ in 0..50 {
        scenario.step();
    }
    let buffered = scenario.client.metrics().snapshots_ingested;

    scenario.host.untrack("p1");
    authority.borrow_mut().x = 500.0;
    for _ in 0..50 {
        scenario.step();
    }

    assert_eq!(scenario.client.metrics().snapshots_ingested, buffered);
    assert!(mirror.borrow().x < 500.0);
    assert!(scenario.client.is_mirroring("p1"));
}
