//! entsync - remote entity sync and interpolation
//!
//! Headless runner: drives a host and a client adapter over a simulated
//! jittery link and reports how smoothly the mirror followed the authority.

mod headless;

use anyhow::Result;
use entsync_net::SyncConfig;
use headless::HeadlessConfig;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting entsync v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let sync = match &cli.config {
        Some(path) => SyncConfig::load_from_path(path),
        None => SyncConfig::load(),
    };

    let report = headless::run(HeadlessConfig {
        sync,
        seconds: cli.seconds,
        latency_ms: cli.latency_ms,
        jitter_ms: cli.jitter_ms,
        loss: cli.loss,
        seed: cli.seed,
        trace: cli.trace,
    })?;

    if let Some(path) = &cli.metrics {
        entsync_testkit::MetricsSink::create(path)?.write(&report)?;
        info!("Wrote metrics to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

struct CliOptions {
    config: Option<PathBuf>,
    seconds: f64,
    latency_ms: f64,
    jitter_ms: f64,
    loss: f64,
    seed: u64,
    trace: Option<PathBuf>,
    metrics: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: None,
            seconds: 5.0,
            latency_ms: 60.0,
            jitter_ms: 25.0,
            loss: 0.0,
            seed: 1,
            trace: None,
            metrics: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => opts.config = path_arg(&arg, args.next()),
                "--trace" => opts.trace = path_arg(&arg, args.next()),
                "--metrics" => opts.metrics = path_arg(&arg, args.next()),
                "--seconds" => number_arg(&arg, args.next(), &mut opts.seconds),
                "--latency-ms" => number_arg(&arg, args.next(), &mut opts.latency_ms),
                "--jitter-ms" => number_arg(&arg, args.next(), &mut opts.jitter_ms),
                "--loss" => number_arg(&arg, args.next(), &mut opts.loss),
                "--seed" => match args.next().map(|raw| raw.parse::<u64>()) {
                    Some(Ok(value)) => opts.seed = value,
                    Some(Err(err)) => tracing::error!(%err, "--seed must be an integer"),
                    None => tracing::error!("--seed requires an integer"),
                },
                other => tracing::warn!("Ignoring unknown argument {other}"),
            }
        }

        opts
    }
}

fn path_arg(flag: &str, value: Option<String>) -> Option<PathBuf> {
    if value.is_none() {
        tracing::error!("{flag} requires a path");
    }
    value.map(PathBuf::from)
}

fn number_arg(flag: &str, value: Option<String>, slot: &mut f64) {
    match value.map(|raw| raw.parse::<f64>()) {
        Some(Ok(number)) if number.is_finite() && number >= 0.0 => *slot = number,
        Some(Ok(_)) => tracing::error!("{flag} must be a non-negative number"),
        Some(Err(err)) => tracing::error!(%err, "{flag} must be a number"),
        None => tracing::error!("{flag} requires a number"),
    }
}
