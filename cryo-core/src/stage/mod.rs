//! Stage actuators
//!
//! Each stage is an open-loop sequence that owns one output channel and is
//! ticked once per second by the host. A tick returns the commands to send;
//! applying them to the voltage source is the host's job, so the sequences
//! stay free of I/O.
//!
//! An actuator never cleans up after itself. Whoever cancels it must
//! de-energize its channel (see [`crate::traits::de_energize`]).

pub mod ramp;
pub mod stage1;
pub mod stage2;

pub use ramp::LinearRamp;
pub use stage1::{Stage1Actuator, Stage1Phase};
pub use stage2::{Stage2Actuator, Stage2Phase};

use heapless::Vec;

use crate::traits::{with_retries, InstrumentError, OutputChannel, VoltageSource};

/// Maximum commands emitted by one tick
pub const MAX_COMMANDS_PER_TICK: usize = 4;

/// Command for the actuator's own output channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputCommand {
    /// Program the setpoint (V)
    SetVoltage(f32),
    /// Switch the output on or off
    SetEnabled(bool),
}

/// Commands produced by one tick, in send order
pub type OutputCommands = Vec<OutputCommand, MAX_COMMANDS_PER_TICK>;

/// A stage sequence driving one output channel
pub trait Actuator {
    /// Channel owned by this stage
    const CHANNEL: OutputChannel;

    /// Advance one tick
    ///
    /// `pump_k` is the helium pump temperature from the latest published
    /// sample, if there is one.
    fn tick(&mut self, pump_k: Option<f32>) -> OutputCommands;
}

/// Send a tick's commands to the voltage source
///
/// Each command is retried; the first command that still fails aborts the
/// rest and its error is returned.
pub fn apply<V: VoltageSource + ?Sized>(
    source: &mut V,
    channel: OutputChannel,
    commands: &[OutputCommand],
) -> Result<(), InstrumentError> {
    for command in commands {
        with_retries(|| match *command {
            OutputCommand::SetVoltage(v) => source.set_voltage(channel, v),
            OutputCommand::SetEnabled(on) => source.set_output_enabled(channel, on),
        })?;
    }
    Ok(())
}
