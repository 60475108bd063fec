//! # Gantry I/O Binary
//!
//! Builds the I/O layer from `io.toml` and runs its fixed-period tick loop.
//! Pin and CAN stimulus comes from a replay script, so the full input,
//! interlock and heartbeat path can be exercised without hardware.
//!
//! # Usage
//!
//! ```bash
//! # Idle loop: heartbeats time out, nothing else happens
//! gantry_io --config config/io.toml
//!
//! # Replay a stimulus script as fast as possible, then stop
//! gantry_io --config config/io.toml --script config/replay.toml --fast
//!
//! # Verbose JSON logs, fixed number of ticks
//! gantry_io --config config/io.toml --cycles 500 -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use gantry_common::prelude::*;
use gantry_io::IoSystem;
use gantry_io::can::frame::CanFrame;
use gantry_io::can::transport::FrameLog;
use gantry_io::machine::{MachineLatch, MachineRequest};
use gantry_io::replay::{Replay, Script};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Frames the simulated transport holds between two ticks.
const TX_QUEUE_DEPTH: usize = 64;

/// Gantry I/O - digital inputs, safety interlocks and CAN node supervision
#[derive(Parser, Debug)]
#[command(name = "gantry_io")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Real-time input, interlock and CAN node layer")]
#[command(long_about = None)]
struct Args {
    /// Path to the I/O configuration file (io.toml).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stimulus script replayed against the loop.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Stop after this many ticks. Without it the loop runs until Ctrl-C,
    /// or until the script is exhausted when one is given.
    #[arg(long)]
    cycles: Option<u64>,

    /// Do not sleep between ticks.
    #[arg(long)]
    fast: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("gantry_io failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load before tracing so the configured level applies; report errors after.
    let config = load_validated::<IoConfig>(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level)?;
    let config = config?;

    info!(
        "Gantry I/O v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let script = match &args.script {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let script = Script::from_toml(&content)?;
            info!(
                events = script.events().len(),
                end_ms = script.end_ms(),
                "replay script loaded from {}",
                path.display()
            );
            Some(script)
        }
        None => None,
    };

    let mut system = IoSystem::from_config(&config, FrameLog::<TX_QUEUE_DEPTH>::new())?;
    let mut machine = MachineLatch::new();

    // Announce ourselves: poll every configured node once.
    for node in &config.can.nodes {
        if let Err(e) = system.send_frame(&CanFrame::poll(node.id)) {
            warn!(node_id = node.id, "initial poll not sent: {e}");
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let with_script = script.is_some();
    let mut replay = Replay::new(script.unwrap_or_default());
    let period = system.tick_period();
    let period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX);
    let mut safe = system.is_safe();
    let mut ticks: u64 = 0;
    let mut timing_violations: u64 = 0;

    info!(tick_period_us = period_us, safe, "entering tick loop");

    while running.load(Ordering::SeqCst) {
        if args.cycles.is_some_and(|limit| ticks >= limit) {
            break;
        }
        if args.cycles.is_none() && with_script && replay.is_finished() {
            break;
        }

        let cycle_start = Instant::now();
        let now_ms = ticks.saturating_mul(period_us) / 1000;

        let summary = replay.step(&mut system, now_ms, &mut machine);
        ticks += 1;

        for frame in system.bus_mut().transport_mut().drain() {
            debug!(id = frame.raw_id(), data = ?frame.bytes(), "frame sent");
        }

        let requests = machine.take_new();
        if !requests.is_empty() {
            report_requests(requests, &machine, now_ms);
        }

        let now_safe = system.is_safe();
        if now_safe != safe {
            match system.first_unsafe() {
                Some(source) => warn!(now_ms, ?source, "interlock aggregate unsafe"),
                None => info!(now_ms, "interlock aggregate safe"),
            }
            safe = now_safe;
        }

        if summary.timeouts > 0 {
            debug!(tick = summary.tick, timeouts = summary.timeouts, "heartbeat timeouts");
        }

        if !args.fast {
            let elapsed = cycle_start.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            } else {
                timing_violations += 1;
                if timing_violations <= 10 || timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: tick took {}us (target {}us)",
                        timing_violations,
                        elapsed.as_micros(),
                        period_us
                    );
                }
            }
        }
    }

    info!(
        ticks,
        severity = ?machine.severity(),
        last_fault = ?machine.last_fault(),
        status_reports = machine.status_report_count(),
        safe = system.is_safe(),
        "Gantry I/O shutdown complete"
    );
    Ok(())
}

fn report_requests(requests: MachineRequest, machine: &MachineLatch, now_ms: u64) {
    if requests.intersects(MachineRequest::STOPPING) {
        warn!(
            now_ms,
            ?requests,
            severity = ?machine.severity(),
            fault = ?machine.last_fault(),
            "machine stop requested"
        );
    } else {
        info!(now_ms, ?requests, "machine request");
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.as_directive().parse()?);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
