//! # Kestrel Safety Loop
//!
//! Host entry point for the safety interlock and homing control loop.
//! Loads and validates the TOML configuration, performs RT setup
//! (mlockall, CPU affinity, SCHED_FIFO — no-ops without the `rt`
//! feature), then drives the [`CycleRunner`] at the configured period
//! until interrupted.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use kestrel_common::consts::DEFAULT_CONFIG_PATH;
use kestrel_safety::config::load_config;
use kestrel_safety::cycle::{rt_setup, CycleRunner};

/// Kestrel safety loop — E-Stop interlock & homing sequencer
#[derive(Parser, Debug)]
#[command(name = "kestrel_safety")]
#[command(author = "Kestrel Machine Co")]
#[command(version)]
#[command(about = "Fixed-period safety interlock and homing control loop")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// CPU core to pin the RT thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Kestrel safety loop v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Kestrel safety loop shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: cycle_time={}µs, axes={}",
        config.machine.cycle_time_us,
        config.machine.axes,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut runner = CycleRunner::new(&config);
    info!("CycleRunner initialized, entering control loop");

    // Graceful shutdown on ctrl-c.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    runner.run(&running)?;

    info!(
        "Loop stopped after {} cycles (avg {}ns, max {}ns, {} overruns)",
        runner.stats.cycle_count,
        runner.stats.avg_cycle_ns(),
        runner.stats.max_cycle_ns,
        runner.stats.overruns,
    );

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
