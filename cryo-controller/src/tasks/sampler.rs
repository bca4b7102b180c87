//! Temperature sampler loop
//!
//! Polls all five thermometers once per tick while a run is active,
//! publishes each complete sample and forwards it to the controller.

use embassy_time::{Instant, Ticker};
use log::{debug, error, info, warn};

use cryo_core::sampler::{PollError, Sampler};

use crate::channels::ControlEvent;
use crate::context::RunContext;

/// Sampler task
#[embassy_executor::task]
pub async fn sampler_task(ctx: &'static RunContext) {
    sampler_loop(ctx).await
}

/// Sampler loop - parks between runs
pub async fn sampler_loop(ctx: &'static RunContext) {
    let control = &ctx.sampler;

    loop {
        control.wait_start().await;
        info!("Sampler started");

        let mut sampler = Sampler::new();
        let started = Instant::now();
        let mut ticker = Ticker::every(ctx.tick());

        loop {
            if control.is_cancelled() {
                break;
            }

            let elapsed_ms = started.elapsed().as_millis();
            match ctx.with_gateway(|gateway| sampler.poll(gateway, elapsed_ms)) {
                Ok(poll) => {
                    match poll.recalibration {
                        Some(Ok(())) => warn!(
                            "Cold head stuck at {} K, gain recalibrated",
                            poll.sample.cold_head_k
                        ),
                        Some(Err(e)) => warn!("Cold head stuck, gain recalibration failed: {}", e),
                        None => {}
                    }

                    let sample = poll.sample;
                    debug!(
                        "t={:.1}s head={:.3}K pump={:.3}K switch={:.3}K",
                        sample.elapsed_ms as f32 / 1000.0,
                        sample.cold_head_k,
                        sample.helium_pump_k,
                        sample.heat_switch_k
                    );
                    ctx.log_sample(&sample);
                    ctx.publish_sample(sample);
                    ctx.events.send(ControlEvent::Sample(sample)).await;
                }
                Err(PollError::Skipped { sensor, error }) => {
                    warn!("{} read failed ({}), tick skipped", sensor, error);
                }
                Err(PollError::Fault { sensor, error }) => {
                    error!("{} read failed ({}), giving up", sensor, error);
                    ctx.events
                        .send(ControlEvent::SamplerFault { sensor, error })
                        .await;
                    break;
                }
            }

            if !control.next_tick(&mut ticker).await {
                break;
            }
        }

        control.finish();
        info!("Sampler stopped");
    }
}
