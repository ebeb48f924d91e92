use std::process::Command;

#[test]
fn headless_run_reports_smooth_motion() {
    let metrics_path = std::env::temp_dir().join(format!(
        "entsync_headless_metrics_{}.json",
        std::process::id()
    ));

    let bin = env!("CARGO_BIN_EXE_entsync");
    let output = Command::new(bin)
        .args([
            "--seconds",
            "2",
            "--latency-ms",
            "40",
            "--jitter-ms",
            "10",
            "--seed",
            "7",
            "--metrics",
            metrics_path.to_str().unwrap(),
        ])
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn entsync");
    assert!(output.status.success(), "entsync exited with {}", output.status);

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse report json");
    assert_eq!(report["test_name"], "headless");
    assert_eq!(report["result"], "pass");
    assert!(report["traffic"]["publishes"].as_u64().unwrap() > 0);
    assert!(report["traffic"]["snapshots_ingested"].as_u64().unwrap() > 0);
    assert!(report["motion"]["frames"].as_u64().unwrap() > 100);

    let written = std::fs::read_to_string(&metrics_path).expect("metrics file written");
    let from_file: serde_json::Value = serde_json::from_str(&written).expect("parse metrics file");
    assert_eq!(from_file["result"], "pass");
    let _ = std::fs::remove_file(metrics_path);
}
