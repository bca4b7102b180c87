//! Stage actuator loop
//!
//! One instance per stage, generic over the actuator sequence. Each tick
//! feeds the latest pump temperature to the sequence and writes whatever
//! commands it returns to the actuator's own channel.
//!
//! The loop never de-energizes its channel on exit; the controller does
//! that after the loop acknowledges the cancel.

use embassy_time::Ticker;
use log::{debug, error, info};

use cryo_core::stage::{self, Actuator, OutputCommand, Stage1Actuator, Stage2Actuator};

use crate::channels::ControlEvent;
use crate::context::RunContext;

/// Stage 1 task (pump heater)
#[embassy_executor::task]
pub async fn stage1_task(ctx: &'static RunContext) {
    stage_loop::<Stage1Actuator>(ctx).await
}

/// Stage 2 task (heat switch)
#[embassy_executor::task]
pub async fn stage2_task(ctx: &'static RunContext) {
    stage_loop::<Stage2Actuator>(ctx).await
}

/// Actuator loop - parks between runs
pub async fn stage_loop<A: Actuator + Default>(ctx: &'static RunContext) {
    let channel = A::CHANNEL;
    let control = ctx.stage_control(channel);

    loop {
        control.wait_start().await;
        info!("Actuator on {} started", channel);

        let mut actuator = A::default();
        let mut ticker = Ticker::every(ctx.tick());

        loop {
            if control.is_cancelled() {
                break;
            }

            let pump_k = ctx.latest_sample().map(|sample| sample.helium_pump_k);
            let commands = actuator.tick(pump_k);

            for command in &commands {
                match command {
                    OutputCommand::SetEnabled(on) => {
                        info!("{} output {}", channel, if *on { "on" } else { "off" });
                    }
                    OutputCommand::SetVoltage(v) => debug!("{} setpoint {:.3} V", channel, v),
                }
            }

            if let Err(error) = ctx.with_gateway(|gateway| stage::apply(gateway, channel, &commands)) {
                error!("Write to {} failed ({}), actuator exiting", channel, error);
                ctx.events
                    .send(ControlEvent::ActuatorFault { channel, error })
                    .await;
                break;
            }

            if !control.next_tick(&mut ticker).await {
                break;
            }
        }

        control.finish();
        info!("Actuator on {} stopped", channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::future::Future;

    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_time::Timer;

    use cryo_core::traits::{InstrumentError, OutputChannel};

    use crate::context::tests::shared_context;

    /// Run `script` next to one actuator loop
    fn with_stage<A: Actuator + Default, F: Future>(
        ctx: &'static RunContext,
        script: F,
    ) -> F::Output {
        match block_on(select(script, stage_loop::<A>(ctx))) {
            Either::First(output) => output,
            Either::Second(()) => unreachable!("actuator loop returned"),
        }
    }

    #[test]
    fn test_ramp_reaches_output_and_cancel_leaves_channel() {
        let (ctx, fridge) = shared_context();

        with_stage::<Stage1Actuator, _>(ctx, async {
            assert!(ctx.stage1.start());
            Timer::after(ctx.tick() * 3).await;

            let output = fridge.with(|f| f.output(OutputChannel::PumpHeater));
            assert!(output.enabled);
            assert!(output.volts > 0.0 && output.volts < 1.0);

            ctx.stage1.cancel();
            assert!(ctx.stage1.wait_stopped(ctx.tick()).await);
            // De-energizing is the controller's job
            assert!(fridge.with(|f| f.output(OutputChannel::PumpHeater)).enabled);
        });
    }

    #[test]
    fn test_stage2_silent_while_settling() {
        let (ctx, fridge) = shared_context();

        with_stage::<Stage2Actuator, _>(ctx, async {
            assert!(ctx.stage2.start());
            Timer::after(ctx.tick() * 3).await;
            assert!(fridge
                .with(|f| f.output(OutputChannel::HeatSwitch))
                .is_de_energized());
        });
    }

    #[test]
    fn test_persistent_write_failure_reports_and_exits() {
        let (ctx, fridge) = shared_context();
        fridge.with(|f| f.fail_writes(OutputChannel::PumpHeater, u8::MAX));

        with_stage::<Stage1Actuator, _>(ctx, async {
            assert!(ctx.stage1.start());
            assert_eq!(
                ctx.events.receive().await,
                ControlEvent::ActuatorFault {
                    channel: OutputChannel::PumpHeater,
                    error: InstrumentError::Timeout,
                }
            );
            assert!(ctx.stage1.wait_stopped(ctx.tick() * 2).await);
            assert!(!ctx.stage1.is_running());
        });
    }
}
