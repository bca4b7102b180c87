//! Stage 1: pump heater ramp and 50 K hold
//!
//! Heats the helium sorption pump so it releases its gas onto the cold
//! head. Channel 1 ramps from 0 V to 25 V over five minutes, then a
//! hysteresis band on the pump temperature keeps it near 48 K.

use super::ramp::LinearRamp;
use super::{Actuator, OutputCommand, OutputCommands};
use crate::traits::OutputChannel;

/// Full heater voltage at the end of the ramp (V)
pub const STAGE1_TARGET_V: f32 = 25.0;

/// Ramp duration in one-second steps
pub const STAGE1_RAMP_STEPS: u32 = 300;

/// Pump temperature above which the heater is switched off (K)
pub const STAGE1_HOLD_UPPER_K: f32 = 48.0;

/// Pump temperature below which the heater is switched back on (K)
pub const STAGE1_HOLD_LOWER_K: f32 = 47.0;

/// Reduced heater voltage used when re-enabling during the hold (V)
pub const STAGE1_HOLD_V: f32 = 2.5;

/// Stage 1 phase, for status display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage1Phase {
    /// Not ticked yet
    Pending,
    /// Ramping; steps taken so far
    Ramp(u32),
    /// Holding; whether the heater output is currently on
    Hold { heater_on: bool },
}

/// Stage 1 actuator
#[derive(Debug, Clone)]
pub struct Stage1Actuator {
    ramp: LinearRamp,
    energized: bool,
    heater_on: bool,
    /// Set the first time the pump goes over the upper limit; until then
    /// the heater is never switched back on at reduced voltage
    upper_limit_seen: bool,
}

impl Default for Stage1Actuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage1Actuator {
    /// Create a fresh Stage 1 sequence
    pub const fn new() -> Self {
        Self {
            ramp: LinearRamp::new(STAGE1_TARGET_V, STAGE1_RAMP_STEPS),
            energized: false,
            heater_on: false,
            upper_limit_seen: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Stage1Phase {
        if !self.energized {
            Stage1Phase::Pending
        } else if !self.ramp.is_complete() {
            Stage1Phase::Ramp(self.ramp.steps_taken())
        } else {
            Stage1Phase::Hold {
                heater_on: self.heater_on,
            }
        }
    }

    fn hold(&mut self, pump_k: f32) -> OutputCommands {
        let mut commands = OutputCommands::new();
        if pump_k > STAGE1_HOLD_UPPER_K {
            self.upper_limit_seen = true;
            if self.heater_on {
                self.heater_on = false;
                let _ = commands.push(OutputCommand::SetEnabled(false));
            }
        } else if pump_k < STAGE1_HOLD_LOWER_K && self.upper_limit_seen && !self.heater_on {
            self.heater_on = true;
            let _ = commands.push(OutputCommand::SetVoltage(STAGE1_HOLD_V));
            let _ = commands.push(OutputCommand::SetEnabled(true));
        }
        commands
    }
}

impl Actuator for Stage1Actuator {
    const CHANNEL: OutputChannel = OutputChannel::PumpHeater;

    fn tick(&mut self, pump_k: Option<f32>) -> OutputCommands {
        let mut commands = OutputCommands::new();

        if !self.energized {
            self.energized = true;
            self.heater_on = true;
            let _ = commands.push(OutputCommand::SetVoltage(0.0));
            let _ = commands.push(OutputCommand::SetEnabled(true));
        }

        if let Some(v) = self.ramp.next_setpoint() {
            let _ = commands.push(OutputCommand::SetVoltage(v));
            return commands;
        }

        match pump_k {
            Some(k) => self.hold(k),
            None => commands,
        }
    }
}
