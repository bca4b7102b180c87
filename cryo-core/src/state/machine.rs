//! Stage state machine
//!
//! The transition function is pure. Side effects (starting actuators,
//! de-energizing channels) are decided by the orchestrator around it.

use super::events::CooldownEvent;

/// Cooldown stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StageState {
    /// No stage running; waiting for a run or its first sample
    #[default]
    Idle,
    /// Pump heater sequence running on channel 1
    Stage1Active,
    /// Heat switch sequence running on channel 2
    Stage2Active,
    /// Run ended; terminal until the next run starts
    Stopped,
}

impl StageState {
    /// Whether a stage actuator is running in this state
    pub fn stage_running(&self) -> bool {
        matches!(self, StageState::Stage1Active | StageState::Stage2Active)
    }

    /// Whether this state ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Stopped)
    }

    /// Short label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            StageState::Idle => "idle",
            StageState::Stage1Active => "stage 1",
            StageState::Stage2Active => "stage 2",
            StageState::Stopped => "stopped",
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: CooldownEvent) -> Self {
        use CooldownEvent::*;
        use StageState::*;

        match (self, event) {
            // A new run always re-enters through Idle
            (Idle | Stopped, RunStarted) => Idle,

            (Idle, FirstSample) => Stage1Active,

            // Automatic and manual paths share the same edge
            (Stage1Active, ThresholdsReached | JumpRequested) => Stage2Active,

            (Idle | Stage1Active | Stage2Active, StopRequested | FaultDetected) => Stopped,

            _ => self,
        }
    }
}

impl core::fmt::Display for StageState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
