//! Cryo - Staged Cooldown Controller
//!
//! Host binary that runs the two-stage cooldown of a sorption fridge:
//! samples five thermometers once per second, ramps the pump heater until
//! the cold head is cold enough, then hands over to the heat switch.
//!
//! All control loops run on one embassy std executor. The operator console
//! runs on its own thread and talks to the loops through the run context.

use std::path::PathBuf;

use clap::Parser;
use embassy_executor::{SpawnError, Spawner};
use embassy_time::{Duration, Timer};
use log::{error, info, trace};
use static_cell::StaticCell;

use cryo_core::config::ThresholdConfig;
use cryo_drivers::SimulatedFridge;

mod channels;
mod config;
mod console;
mod context;
mod controller;
mod sample_log;
mod tasks;

use crate::context::RunContext;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "cryo-controller", version, about = "Staged cooldown controller")]
struct Args {
    /// Settings file (TOML); defaults apply if it does not exist
    #[arg(long, default_value = "cooldown.toml")]
    config: PathBuf,

    /// Loop period in milliseconds; lower values speed up the simulation
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Freeze the simulated cold-head reading after this many polls
    #[arg(long)]
    saturate_after: Option<u32>,
}

// Shared state for every loop (must live forever for loop references)
static CONTEXT: StaticCell<RunContext> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .format_timestamp_millis()
        .init();

    info!("Cryo cooldown controller starting...");

    let settings = match config::load(&args.config) {
        Ok(settings) => {
            info!("Settings loaded from {}", args.config.display());
            settings
        }
        Err(e) => {
            error!("{}; using defaults", e);
            ThresholdConfig::default()
        }
    };

    let mut fridge = SimulatedFridge::new();
    if let Some(polls) = args.saturate_after {
        info!("Cold-head amplifier will saturate after {} polls", polls);
        fridge.saturate_cold_head_after(polls);
    }

    let tick = Duration::from_millis(args.tick_ms.max(1));
    let ctx: &'static RunContext =
        CONTEXT.init(RunContext::new(Box::new(fridge), settings, tick));

    if let Err(e) = spawn_tasks(&spawner, ctx, args.config) {
        error!("Failed to spawn tasks: {:?}", e);
        std::process::exit(1);
    }

    if let Err(e) = console::spawn(ctx) {
        error!("Failed to start console: {}", e);
        std::process::exit(1);
    }

    info!("All tasks spawned, controller running");

    // Main task has nothing else to do; the controller task exits the process
    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Spawn the long-lived loops
fn spawn_tasks(
    spawner: &Spawner,
    ctx: &'static RunContext,
    settings_path: PathBuf,
) -> Result<(), SpawnError> {
    spawner.spawn(tasks::sampler_task(ctx))?;
    spawner.spawn(tasks::stage1_task(ctx))?;
    spawner.spawn(tasks::stage2_task(ctx))?;
    spawner.spawn(tasks::controller_task(ctx, settings_path))?;
    Ok(())
}
