//! Controller loop
//!
//! Serializes every stage transition: operator commands, control events
//! and the deferred start are handled one at a time on this loop.

use std::path::PathBuf;

use embassy_futures::select::{select3, Either3};
use embassy_time::{Instant, Timer};
use log::info;

use crate::context::RunContext;
use crate::controller::{Controller, Flow};

/// Controller task - exits the process when the operator quits
#[embassy_executor::task]
pub async fn controller_task(ctx: &'static RunContext, settings_path: PathBuf) {
    controller_loop(ctx, settings_path).await;

    info!("Shutting down");
    std::process::exit(0);
}

/// Controller loop - returns when the operator quits
pub async fn controller_loop(ctx: &'static RunContext, settings_path: PathBuf) {
    info!("Controller loop started");

    let mut controller = Controller::new(ctx, settings_path);
    controller.publish_status();

    loop {
        let flow = match select3(
            ctx.commands.receive(),
            ctx.events.receive(),
            wait_until(controller.pending_start()),
        )
        .await
        {
            Either3::First(command) => controller.handle_command(command).await,
            Either3::Second(event) => {
                controller.handle_event(event).await;
                Flow::Continue
            }
            Either3::Third(()) => {
                controller.start_pending().await;
                Flow::Continue
            }
        };

        controller.publish_status();

        if flow == Flow::Exit {
            break;
        }
    }

    info!("Controller loop finished");
}

/// Wait for a deadline, or forever if there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => Timer::at(at).await,
        None => core::future::pending().await,
    }
}
