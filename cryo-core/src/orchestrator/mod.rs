//! Cooldown orchestrator
//!
//! Owns the [`StageState`] and decides, for every operator command and
//! every published sample, which [`Action`]s the runtime has to carry out.
//! It does no I/O itself: the host executes the returned actions in order
//! and reports hardware failures back through [`Orchestrator::fault`].
//!
//! Actions are ordered so that a channel is always de-energized after its
//! actuator has been cancelled and before the next stage is started.

use core::fmt;

use heapless::Vec;

use crate::config::Thresholds;
use crate::sampler::TemperatureSample;
use crate::state::{CooldownEvent, StageState};
use crate::traits::OutputChannel;

/// Maximum actions produced by one orchestrator call
pub const MAX_ACTIONS: usize = 8;

/// Work for the runtime, executed in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Command 0 V and disable the channel (retried, outcome logged)
    DeEnergize(OutputChannel),
    /// Start the temperature sampler
    StartSampler,
    /// Cancel the temperature sampler
    CancelSampler,
    /// Start the actuator owning this channel
    StartStage(OutputChannel),
    /// Cancel the actuator owning this channel and wait for it to stop
    CancelStage(OutputChannel),
}

/// Ordered list of actions
pub type Actions = Vec<Action, MAX_ACTIONS>;

/// Operator commands that were refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A run is already in progress
    RunActive,
    /// A deferred start is already armed
    StartPending,
    /// Manual jump is only possible from Stage 1
    NotInStage1(StageState),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::RunActive => f.write_str("a cooldown run is already active"),
            CommandError::StartPending => f.write_str("a deferred start is already pending"),
            CommandError::NotInStage1(state) => {
                write!(f, "jump to stage 2 needs stage 1 to be active (now {})", state)
            }
        }
    }
}

/// Whether a sample satisfies both Stage 1 exit conditions
///
/// Both comparisons are strict and are evaluated on the same sample.
pub fn stage1_exit_reached(thresholds: &Thresholds, sample: &TemperatureSample) -> bool {
    sample.helium_pump_k > thresholds.pump_lower_bound_k
        && sample.cold_head_k < thresholds.cold_head_k
}

/// The actuator owning a stage state's channel, if any
fn running_stage(state: StageState) -> Option<OutputChannel> {
    match state {
        StageState::Stage1Active => Some(OutputChannel::PumpHeater),
        StageState::Stage2Active => Some(OutputChannel::HeatSwitch),
        StageState::Idle | StageState::Stopped => None,
    }
}

fn push(actions: &mut Actions, action: Action) {
    // No path produces more than MAX_ACTIONS
    let _ = actions.push(action);
}

/// Stage orchestrator
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    state: StageState,
    thresholds: Thresholds,
    run_active: bool,
}

impl Orchestrator {
    /// Create an idle orchestrator with no run
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Whether a run is in progress
    pub fn is_run_active(&self) -> bool {
        self.run_active
    }

    /// Thresholds snapshotted for the current (or last) run
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn apply(&mut self, event: CooldownEvent) {
        self.state = self.state.transition(event);
    }

    /// Start a run with a snapshot of `thresholds`
    ///
    /// Both channels are de-energized before the sampler starts, whatever
    /// state the previous run left them in. Stage 1 follows on the first
    /// published sample.
    pub fn begin_run(&mut self, thresholds: Thresholds) -> Result<Actions, CommandError> {
        if self.run_active {
            return Err(CommandError::RunActive);
        }

        self.thresholds = thresholds;
        self.run_active = true;
        self.apply(CooldownEvent::RunStarted);

        let mut actions = Actions::new();
        for channel in OutputChannel::ALL {
            push(&mut actions, Action::DeEnergize(channel));
        }
        push(&mut actions, Action::StartSampler);
        Ok(actions)
    }

    /// React to a newly published sample
    pub fn on_sample(&mut self, sample: &TemperatureSample) -> Actions {
        let mut actions = Actions::new();
        if !self.run_active {
            return actions;
        }

        match self.state {
            StageState::Idle => {
                self.apply(CooldownEvent::FirstSample);
                push(&mut actions, Action::StartStage(OutputChannel::PumpHeater));
            }
            StageState::Stage1Active if stage1_exit_reached(&self.thresholds, sample) => {
                self.apply(CooldownEvent::ThresholdsReached);
                self.push_stage2_handover(&mut actions);
            }
            _ => {}
        }
        actions
    }

    /// Operator-confirmed jump from Stage 1 to Stage 2
    pub fn jump_to_stage2(&mut self) -> Result<Actions, CommandError> {
        if self.state != StageState::Stage1Active {
            return Err(CommandError::NotInStage1(self.state));
        }
        self.apply(CooldownEvent::JumpRequested);

        let mut actions = Actions::new();
        self.push_stage2_handover(&mut actions);
        Ok(actions)
    }

    fn push_stage2_handover(&self, actions: &mut Actions) {
        push(actions, Action::CancelStage(OutputChannel::PumpHeater));
        push(actions, Action::DeEnergize(OutputChannel::PumpHeater));
        push(actions, Action::StartStage(OutputChannel::HeatSwitch));
    }

    /// Operator-confirmed stop
    ///
    /// With no active run nothing changes and no actions are returned.
    pub fn stop(&mut self) -> Actions {
        self.end_run(CooldownEvent::StopRequested)
    }

    /// End the run after a hardware fault
    pub fn fault(&mut self) -> Actions {
        self.end_run(CooldownEvent::FaultDetected)
    }

    fn end_run(&mut self, event: CooldownEvent) -> Actions {
        let mut actions = Actions::new();
        if !self.run_active {
            return actions;
        }

        if let Some(channel) = running_stage(self.state) {
            push(&mut actions, Action::CancelStage(channel));
        }
        for channel in OutputChannel::ALL {
            push(&mut actions, Action::DeEnergize(channel));
        }
        push(&mut actions, Action::CancelSampler);

        self.apply(event);
        self.run_active = false;
        actions
    }
}
