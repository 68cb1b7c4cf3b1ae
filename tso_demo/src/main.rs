//! # Threadsafe Object Demo Binary
//!
//! Runs the sensor -> controller -> motor -> logger pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Built-in defaults, run until Ctrl+C
//! tso_demo
//!
//! # Config file, fixed number of cycles
//! tso_demo --config demo.toml --cycles 5000
//!
//! # Verbose JSON logs
//! tso_demo -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tso::config::ConfigLoader;
use tso_demo::{DemoConfig, Pipeline};

/// Threadsafe object demo - slider driven current controller
#[derive(Parser, Debug)]
#[command(name = "tso_demo")]
#[command(version)]
#[command(about = "Sensor -> controller -> motor pipeline built on threadsafe objects")]
#[command(long_about = None)]
struct Args {
    /// Path to the demo configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many sensor samples (overrides the config file)
    #[arg(long)]
    cycles: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Demo failed: {}", e);
        eprintln!("tso_demo: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DemoConfig::load_validated(path)?,
        None => DemoConfig::default(),
    };
    if args.cycles.is_some() {
        config.demo.cycles = args.cycles;
    }

    setup_tracing(&args, &config);

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let pipeline = Pipeline::new(config.demo, &config.object);

    let running = pipeline.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let stats = pipeline.run()?;
    info!(
        samples = stats.samples,
        commands = stats.commands,
        resyncs = stats.controller_resyncs,
        motor_cycles = stats.motor_cycles,
        reports = stats.reports,
        "Demo shutdown complete"
    );
    Ok(())
}

/// Setup tracing subscriber from CLI arguments and the config file.
fn setup_tracing(args: &Args, config: &DemoConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(config.shared.log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .init();
    }
}
