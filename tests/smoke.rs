use entsync_core::{shared, FixedRole, Sprite};
use entsync_net::{MemoryStateStore, SyncAdapter, SyncConfig, TrackOptions};
use entsync_testkit::{TraceEvent, TraceSink};
use std::rc::Rc;

#[test]
fn trace_stream_can_be_written() {
    let mut sink = TraceSink::create(std::env::temp_dir().join("entsync_trace.jsonl"))
        .expect("can create temp trace");
    let event = TraceEvent {
        at_ms: 16.0,
        kind: "SmokeTest",
        key: "runner",
        x: 1.0,
        y: 2.0,
    };
    sink.write(&event).expect("can write event");
}

#[test]
fn shared_store_loopback_mirrors_position() {
    let store = MemoryStateStore::new();
    let mut host = SyncAdapter::new(
        Box::new(FixedRole::host("host")),
        Rc::new(store.clone()),
        SyncConfig::default(),
    )
    .expect("host adapter");
    let mut client = SyncAdapter::new(
        Box::new(FixedRole::client("guest")),
        Rc::new(store.clone()),
        SyncConfig::default(),
    )
    .expect("client adapter");

    let mirror = shared(Sprite::default());
    client
        .register_remote("runner", mirror.clone(), None)
        .expect("register mirror");
    host.track("runner", shared(Sprite::at(12.0, 34.0)), TrackOptions::default())
        .expect("track");
    client.pump(0.0);

    assert_eq!((mirror.borrow().x, mirror.borrow().y), (12.0, 34.0));
}
