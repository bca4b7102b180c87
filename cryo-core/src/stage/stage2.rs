//! Stage 2: heat switch ramp and 6 V hold
//!
//! Runs after the pump heater is off. The heat switch is left to cool for
//! five minutes, then channel 2 ramps to 6 V over five minutes and stays
//! there. Pure timing, no thresholds.

use super::ramp::LinearRamp;
use super::{Actuator, OutputCommand, OutputCommands};
use crate::traits::OutputChannel;

/// Ticks to wait before energizing the heat switch
pub const STAGE2_SETTLE_TICKS: u32 = 300;

/// Heat switch drive voltage (V)
pub const STAGE2_TARGET_V: f32 = 6.0;

/// Ramp duration in one-second steps
pub const STAGE2_RAMP_STEPS: u32 = 300;

/// Stage 2 phase, for status display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage2Phase {
    /// Waiting for the heat switch to cool; ticks remaining
    Settle(u32),
    /// Ramping; steps taken so far
    Ramp(u32),
    /// Holding at full voltage
    Hold,
}

/// Stage 2 actuator
#[derive(Debug, Clone)]
pub struct Stage2Actuator {
    settle_remaining: u32,
    ramp: LinearRamp,
    energized: bool,
}

impl Default for Stage2Actuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage2Actuator {
    /// Create a fresh Stage 2 sequence
    pub const fn new() -> Self {
        Self {
            settle_remaining: STAGE2_SETTLE_TICKS,
            ramp: LinearRamp::new(STAGE2_TARGET_V, STAGE2_RAMP_STEPS),
            energized: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Stage2Phase {
        if self.settle_remaining > 0 {
            Stage2Phase::Settle(self.settle_remaining)
        } else if !self.ramp.is_complete() {
            Stage2Phase::Ramp(self.ramp.steps_taken())
        } else {
            Stage2Phase::Hold
        }
    }
}

impl Actuator for Stage2Actuator {
    const CHANNEL: OutputChannel = OutputChannel::HeatSwitch;

    fn tick(&mut self, _pump_k: Option<f32>) -> OutputCommands {
        let mut commands = OutputCommands::new();

        if self.settle_remaining > 0 {
            self.settle_remaining -= 1;
            return commands;
        }

        if !self.energized {
            self.energized = true;
            let _ = commands.push(OutputCommand::SetVoltage(0.0));
            let _ = commands.push(OutputCommand::SetEnabled(true));
        }

        if let Some(v) = self.ramp.next_setpoint() {
            let _ = commands.push(OutputCommand::SetVoltage(v));
        }
        commands
    }
}
