//! Cooldown controller
//!
//! Wraps the core [`Orchestrator`] and carries out the actions it returns
//! against the run context: starting and cancelling loops and
//! de-energizing channels. Also owns the deferred start.
//!
//! A failed de-energize, a loop that does not acknowledge its cancel, or a
//! loop that is still running when it should start aborts the remaining
//! actions of a transition and faults the run. Stage 2 is therefore never
//! started next to a Stage 1 that may still be live. On the stop path every
//! action is attempted and each failure is logged.

use std::fmt;
use std::path::PathBuf;

use chrono::Timelike;
use embassy_time::{Duration, Instant};
use log::{error, info, warn};

use cryo_core::config::TimeOfDay;
use cryo_core::orchestrator::{Action, CommandError, Orchestrator};
use cryo_core::safety::MAX_CONSECUTIVE_READ_FAILURES;
use cryo_core::state::StageState;
use cryo_core::traits::{de_energize, InstrumentError, OutputChannel, MAX_ATTEMPTS};

use crate::channels::{Command, ControlEvent};
use crate::config;
use crate::context::{RunContext, StatusSnapshot};

/// Whether the controller loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// How a failed action is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escalation {
    /// Abort the remaining actions
    Abort,
    /// Log and carry on
    BestEffort,
}

/// Why a transition was cut short
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    /// The channel could not be de-energized
    DeEnergize(OutputChannel, InstrumentError),
    /// The loop was still running from an earlier start
    Busy(&'static str),
    /// The loop did not stop within two ticks of its cancel
    Unacknowledged(&'static str),
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::DeEnergize(channel, error) => {
                write!(f, "could not de-energize {}: {}", channel, error)
            }
            Abort::Busy(name) => write!(f, "{} still running", name),
            Abort::Unacknowledged(name) => {
                write!(f, "{} did not acknowledge cancel within two ticks", name)
            }
        }
    }
}

impl Escalation {
    /// Drop the remaining actions, or log `abort` and carry on
    fn check(self, abort: Abort) -> Result<(), Abort> {
        match self {
            Escalation::Abort => Err(abort),
            Escalation::BestEffort => {
                error!("{}", abort);
                Ok(())
            }
        }
    }
}

/// Current wall-clock time of day
fn local_time_of_day() -> TimeOfDay {
    let now = chrono::Local::now();
    TimeOfDay::from_seconds(now.num_seconds_from_midnight()).unwrap_or(TimeOfDay::MIDNIGHT)
}

fn stage_name(channel: OutputChannel) -> &'static str {
    match channel {
        OutputChannel::PumpHeater => "Stage 1",
        OutputChannel::HeatSwitch => "Stage 2",
    }
}

/// Controller state for one controller loop
pub struct Controller<'a> {
    ctx: &'a RunContext,
    orchestrator: Orchestrator,
    settings_path: PathBuf,
    pending_start: Option<Instant>,
}

impl<'a> Controller<'a> {
    /// Create a controller with no run
    pub fn new(ctx: &'a RunContext, settings_path: PathBuf) -> Self {
        Self {
            ctx,
            orchestrator: Orchestrator::new(),
            settings_path,
            pending_start: None,
        }
    }

    /// Current stage
    pub fn state(&self) -> StageState {
        self.orchestrator.state()
    }

    /// Deadline of the armed deferred start
    pub fn pending_start(&self) -> Option<Instant> {
        self.pending_start
    }

    /// Publish the status snapshot for the console
    pub fn publish_status(&self) {
        self.ctx.set_status(StatusSnapshot {
            state: self.orchestrator.state(),
            run_active: self.orchestrator.is_run_active(),
            latest: self.ctx.latest_sample(),
            scheduled_for: self.pending_start,
        });
    }

    /// Handle an operator command
    pub async fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Start => self.start().await,
            Command::Stop => self.stop().await,
            Command::JumpToStage2 => self.jump().await,
            Command::Reload => self.reload(),
            Command::Quit => {
                self.stop().await;
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Handle an event from the sampler or an actuator
    pub async fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Sample(sample) => {
                let before = self.orchestrator.state();
                let actions = self.orchestrator.on_sample(&sample);
                match (before, self.orchestrator.state()) {
                    (StageState::Idle, StageState::Stage1Active) => {
                        info!("First sample received, starting stage 1");
                    }
                    (StageState::Stage1Active, StageState::Stage2Active) => {
                        info!(
                            "Stage 1 complete: cold head {:.3} K, pump {:.3} K",
                            sample.cold_head_k, sample.helium_pump_k
                        );
                    }
                    _ => {}
                }
                self.run(&actions).await;
            }
            ControlEvent::SamplerFault { sensor, error } => {
                if self.orchestrator.is_run_active() {
                    error!(
                        "{} failed {} times in a row ({}), stopping run",
                        sensor, MAX_CONSECUTIVE_READ_FAILURES, error
                    );
                    self.fault_stop().await;
                }
            }
            ControlEvent::ActuatorFault { channel, error } => {
                if self.orchestrator.is_run_active() {
                    error!(
                        "Write to {} failed after {} attempts ({}), stopping run",
                        channel, MAX_ATTEMPTS, error
                    );
                    self.fault_stop().await;
                }
            }
        }
    }

    /// Fire the deferred start once its deadline has passed
    pub async fn start_pending(&mut self) {
        if self.pending_start.take().is_some() {
            info!("Scheduled start time reached");
            self.begin_run().await;
        }
    }

    async fn start(&mut self) {
        if self.pending_start.is_some() {
            warn!("Start rejected: {}", CommandError::StartPending);
            return;
        }
        if self.orchestrator.is_run_active() {
            warn!("Start rejected: {}", CommandError::RunActive);
            return;
        }

        match self.ctx.settings().start_time() {
            Ok(None) => self.begin_run().await,
            Ok(Some(target)) => {
                let delay = local_time_of_day().seconds_until(target);
                // One-shot: a later start must not re-arm it
                self.ctx.clear_schedule();
                self.pending_start = Some(Instant::now() + Duration::from_secs(u64::from(delay)));
                info!("Cooldown scheduled for {} ({} s from now)", target, delay);
            }
            Err(e) => {
                self.ctx.clear_schedule();
                warn!("Scheduled start rejected: {}; schedule cleared, run not started", e);
            }
        }
    }

    async fn begin_run(&mut self) {
        let config = self.ctx.settings();
        let actions = match self.orchestrator.begin_run(config.thresholds) {
            Ok(actions) => actions,
            Err(e) => {
                warn!("Start rejected: {}", e);
                return;
            }
        };

        info!(
            "Cooldown started (stage 1 ends below {} K cold head, above {} K pump)",
            config.thresholds.cold_head_k, config.thresholds.pump_lower_bound_k
        );

        // Leftovers from the previous run must not drive this one
        while self.ctx.events.try_receive().is_ok() {}
        self.ctx.clear_sample();
        self.ctx.open_sample_log(&config);

        self.run(&actions).await;
    }

    async fn jump(&mut self) {
        match self.orchestrator.jump_to_stage2() {
            Ok(actions) => {
                info!("Manual jump to stage 2");
                self.run(&actions).await;
            }
            Err(e) => warn!("Jump rejected: {}", e),
        }
    }

    async fn stop(&mut self) {
        if self.pending_start.take().is_some() {
            info!("Pending scheduled start cancelled");
            return;
        }

        let actions = self.orchestrator.stop();
        if actions.is_empty() {
            info!("No cooldown run active");
            return;
        }

        info!("Stopping cooldown");
        let _ = self.execute(&actions, Escalation::BestEffort).await;
        self.ctx.close_sample_log();
        info!("Cooldown stopped");
    }

    async fn fault_stop(&mut self) {
        let actions = self.orchestrator.fault();
        let _ = self.execute(&actions, Escalation::BestEffort).await;
        self.ctx.close_sample_log();
        error!("Cooldown stopped after hardware fault");
    }

    fn reload(&mut self) {
        match config::load(&self.settings_path) {
            Ok(settings) => {
                self.ctx.replace_settings(settings);
                info!("Settings reloaded from {}", self.settings_path.display());
                if self.orchestrator.is_run_active() {
                    info!("New thresholds apply from the next run");
                }
            }
            Err(e) => warn!("{}; keeping previous settings", e),
        }
    }

    /// Execute transition actions; any abort faults the run
    async fn run(&mut self, actions: &[Action]) {
        if let Err(abort) = self.execute(actions, Escalation::Abort).await {
            error!("Transition aborted ({}), stopping run", abort);
            self.fault_stop().await;
        }
    }

    async fn execute(&self, actions: &[Action], escalation: Escalation) -> Result<(), Abort> {
        let ack_timeout = self.ctx.tick() * 2;

        for action in actions {
            match *action {
                Action::DeEnergize(channel) => {
                    match self.ctx.with_gateway(|gateway| de_energize(gateway, channel)) {
                        Ok(()) => info!("{} de-energized", channel),
                        Err(e) => escalation.check(Abort::DeEnergize(channel, e))?,
                    }
                }
                Action::StartSampler => {
                    if !self.ctx.sampler.start() {
                        escalation.check(Abort::Busy("sampler"))?;
                    }
                }
                Action::CancelSampler => {
                    self.ctx.sampler.cancel();
                    if !self.ctx.sampler.wait_stopped(ack_timeout).await {
                        escalation.check(Abort::Unacknowledged("sampler"))?;
                    }
                }
                Action::StartStage(channel) => {
                    if !self.ctx.stage_control(channel).start() {
                        escalation.check(Abort::Busy(stage_name(channel)))?;
                    }
                }
                Action::CancelStage(channel) => {
                    let control = self.ctx.stage_control(channel);
                    control.cancel();
                    if !control.wait_stopped(ack_timeout).await {
                        escalation.check(Abort::Unacknowledged(stage_name(channel)))?;
                    }
                }
            }
        }
        Ok(())
    }
}
