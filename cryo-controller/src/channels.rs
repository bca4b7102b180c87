//! Inter-loop communication
//!
//! Operator commands flow from the console to the controller loop; control
//! events flow from the sampler and actuator loops to the controller loop.
//! Every long-lived loop is started and cancelled through a [`LoopControl`].

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Ticker};
use portable_atomic::{AtomicBool, Ordering};

use cryo_core::sampler::TemperatureSample;
use cryo_core::traits::{InstrumentError, OutputChannel, Sensor};

/// Channel capacity for operator commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for control events
const EVENT_CHANNEL_SIZE: usize = 8;

/// Operator commands
///
/// Stop and jump arrive here only after the operator confirmed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a run, or arm the deferred start if one is scheduled
    Start,
    /// Stop the run, or cancel a pending deferred start
    Stop,
    /// Skip straight to Stage 2
    JumpToStage2,
    /// Re-read the settings file
    Reload,
    /// Stop and exit
    Quit,
}

/// Events reported to the controller loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// The sampler published a new sample
    Sample(TemperatureSample),
    /// A sensor failed too many times in a row; the sampler has exited
    SamplerFault {
        sensor: Sensor,
        error: InstrumentError,
    },
    /// An actuator write failed after retries; the actuator has exited
    ActuatorFault {
        channel: OutputChannel,
        error: InstrumentError,
    },
}

/// Command channel (console to controller)
pub type CommandChannel = Channel<CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE>;

/// Event channel (loops to controller)
pub type EventChannel = Channel<CriticalSectionRawMutex, ControlEvent, EVENT_CHANNEL_SIZE>;

/// Start/cancel handshake for one long-lived loop
///
/// The loop parks in [`LoopControl::wait_start`] between runs. Only one
/// instance can be running at a time: [`LoopControl::start`] refuses a loop
/// that has not yet called [`LoopControl::finish`].
pub struct LoopControl {
    start: Signal<CriticalSectionRawMutex, ()>,
    cancel: Signal<CriticalSectionRawMutex, ()>,
    stopped: Signal<CriticalSectionRawMutex, ()>,
    running: AtomicBool,
}

impl LoopControl {
    /// Create an idle loop control
    pub const fn new() -> Self {
        Self {
            start: Signal::new(),
            cancel: Signal::new(),
            stopped: Signal::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Ask the loop to start
    ///
    /// Returns `false` if it is already running.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.reset();
        self.stopped.reset();
        self.start.signal(());
        true
    }

    /// Ask the loop to stop at its next tick boundary
    ///
    /// No-op if the loop is not running.
    pub fn cancel(&self) {
        if self.is_running() {
            self.cancel.signal(());
        }
    }

    /// Whether the loop is between `start` and `finish`
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether a cancel is pending
    pub fn is_cancelled(&self) -> bool {
        self.cancel.signaled()
    }

    /// Park until the loop is started (loop side)
    pub async fn wait_start(&self) {
        self.start.wait().await;
    }

    /// Wait for the next tick (loop side)
    ///
    /// Returns `false` if the loop was cancelled instead.
    pub async fn next_tick(&self, ticker: &mut Ticker) -> bool {
        match select(ticker.next(), self.cancel.wait()).await {
            Either::First(()) => !self.cancel.signaled(),
            Either::Second(()) => false,
        }
    }

    /// Mark the loop stopped and acknowledge any cancel (loop side)
    pub fn finish(&self) {
        self.cancel.reset();
        self.running.store(false, Ordering::Release);
        self.stopped.signal(());
    }

    /// Wait for the loop to acknowledge a cancel
    ///
    /// Returns `false` if it did not stop within `timeout`.
    pub async fn wait_stopped(&self, timeout: Duration) -> bool {
        if !self.is_running() {
            return true;
        }
        with_timeout(timeout, self.stopped.wait()).await.is_ok()
    }
}
