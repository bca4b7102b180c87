//! Run context
//!
//! Everything the loops share lives here, created once at startup and
//! handed out as `&'static RunContext`. Plain data sits behind blocking
//! mutexes; nothing is held across an await.

use core::cell::{Cell, RefCell};
use std::path::Path;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};
use log::{error, info};

use cryo_core::config::ThresholdConfig;
use cryo_core::sampler::TemperatureSample;
use cryo_core::state::StageState;
use cryo_core::traits::{Instrument, OutputChannel};

use crate::channels::{CommandChannel, EventChannel, LoopControl};
use crate::sample_log::SampleLog;

/// Shared gateway handle
pub type Gateway = Box<dyn Instrument + Send>;

/// Read-only view for the status display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// Current stage
    pub state: StageState,
    /// Whether a run is in progress
    pub run_active: bool,
    /// Latest published sample of the run
    pub latest: Option<TemperatureSample>,
    /// When a pending deferred start fires
    pub scheduled_for: Option<Instant>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: StageState::Idle,
            run_active: false,
            latest: None,
            scheduled_for: None,
        }
    }
}

/// State shared by the controller, sampler, actuators and console
pub struct RunContext {
    gateway: Mutex<CriticalSectionRawMutex, RefCell<Gateway>>,
    latest: Mutex<CriticalSectionRawMutex, Cell<Option<TemperatureSample>>>,
    status: Mutex<CriticalSectionRawMutex, Cell<StatusSnapshot>>,
    settings: Mutex<CriticalSectionRawMutex, RefCell<ThresholdConfig>>,
    sample_log: Mutex<CriticalSectionRawMutex, RefCell<Option<SampleLog>>>,
    tick: Duration,
    /// Operator commands
    pub commands: CommandChannel,
    /// Control events from the loops
    pub events: EventChannel,
    /// Temperature sampler loop
    pub sampler: LoopControl,
    /// Stage 1 actuator loop (channel 1)
    pub stage1: LoopControl,
    /// Stage 2 actuator loop (channel 2)
    pub stage2: LoopControl,
}

impl RunContext {
    /// Create the context around a gateway and the initial settings
    pub fn new(gateway: Gateway, settings: ThresholdConfig, tick: Duration) -> Self {
        Self {
            gateway: Mutex::new(RefCell::new(gateway)),
            latest: Mutex::new(Cell::new(None)),
            status: Mutex::new(Cell::new(StatusSnapshot::default())),
            settings: Mutex::new(RefCell::new(settings)),
            sample_log: Mutex::new(RefCell::new(None)),
            tick,
            commands: CommandChannel::new(),
            events: EventChannel::new(),
            sampler: LoopControl::new(),
            stage1: LoopControl::new(),
            stage2: LoopControl::new(),
        }
    }

    /// Loop period
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Loop control for the actuator owning `channel`
    pub fn stage_control(&self, channel: OutputChannel) -> &LoopControl {
        match channel {
            OutputChannel::PumpHeater => &self.stage1,
            OutputChannel::HeatSwitch => &self.stage2,
        }
    }

    /// Run `f` with exclusive access to the gateway
    pub fn with_gateway<R>(&self, f: impl FnOnce(&mut dyn Instrument) -> R) -> R {
        self.gateway.lock(|gateway| f(&mut **gateway.borrow_mut()))
    }

    /// Latest published sample
    pub fn latest_sample(&self) -> Option<TemperatureSample> {
        self.latest.lock(|latest| latest.get())
    }

    /// Publish a complete sample
    pub fn publish_sample(&self, sample: TemperatureSample) {
        self.latest.lock(|latest| latest.set(Some(sample)));
    }

    /// Forget the previous run's sample
    pub fn clear_sample(&self) {
        self.latest.lock(|latest| latest.set(None));
    }

    /// Current status snapshot
    pub fn status(&self) -> StatusSnapshot {
        self.status.lock(|status| status.get())
    }

    /// Replace the status snapshot
    pub fn set_status(&self, snapshot: StatusSnapshot) {
        self.status.lock(|status| status.set(snapshot));
    }

    /// Copy of the current settings
    pub fn settings(&self) -> ThresholdConfig {
        self.settings.lock(|settings| settings.borrow().clone())
    }

    /// Replace the settings
    pub fn replace_settings(&self, config: ThresholdConfig) {
        self.settings.lock(|settings| *settings.borrow_mut() = config);
    }

    /// Disarm the scheduled start
    pub fn clear_schedule(&self) {
        self.settings
            .lock(|settings| settings.borrow_mut().clear_schedule());
    }

    /// Open the sample log for a new run if logging is enabled
    pub fn open_sample_log(&self, config: &ThresholdConfig) {
        let log = if config.logging_enabled {
            match SampleLog::create(Path::new(config.log_path.as_str())) {
                Ok(log) => {
                    info!("Logging samples to {}", log.path().display());
                    Some(log)
                }
                Err(e) => {
                    error!("{}; sample logging disabled for this run", e);
                    None
                }
            }
        } else {
            None
        };
        self.sample_log.lock(|slot| *slot.borrow_mut() = log);
    }

    /// Append a sample to the run's log, if one is open
    pub fn log_sample(&self, sample: &TemperatureSample) {
        self.sample_log.lock(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(log) = slot.as_mut() {
                if let Err(e) = log.append(sample) {
                    error!("{}; sample logging disabled for this run", e);
                    *slot = None;
                }
            }
        });
    }

    /// Close the run's sample log
    pub fn close_sample_log(&self) {
        self.sample_log.lock(|slot| *slot.borrow_mut() = None);
    }
}
