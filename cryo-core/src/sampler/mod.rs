//! Temperature sampling
//!
//! One poll reads all five thermometers in fixed order and either produces a
//! complete [`TemperatureSample`] or nothing at all. The host runtime decides
//! the cadence; this module owns the bookkeeping that has to survive between
//! polls (stuck-sensor detection and read-failure escalation).

pub mod recalibration;

pub use recalibration::{RecalibrationCounter, RECALIBRATION_REPEATS};

use crate::safety::{ReadFaultMonitor, SafetyStatus, MAX_CONSECUTIVE_READ_FAILURES};
use crate::traits::{InstrumentError, Sensor, Thermometry};

/// One reading of every thermometer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureSample {
    /// Cold head (K)
    pub cold_head_k: f32,
    /// Film burner (K)
    pub film_burner_k: f32,
    /// Mainplate (K)
    pub mainplate_k: f32,
    /// Helium pump (K)
    pub helium_pump_k: f32,
    /// Heat switch (K)
    pub heat_switch_k: f32,
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
}

impl TemperatureSample {
    /// Assemble a sample from readings in [`Sensor::ALL`] order
    pub fn from_readings(readings: [f32; Sensor::COUNT], elapsed_ms: u64) -> Self {
        Self {
            cold_head_k: readings[Sensor::ColdHead.index()],
            film_burner_k: readings[Sensor::FilmBurner.index()],
            mainplate_k: readings[Sensor::Mainplate.index()],
            helium_pump_k: readings[Sensor::HeliumPump.index()],
            heat_switch_k: readings[Sensor::HeatSwitch.index()],
            elapsed_ms,
        }
    }

    /// Reading for one sensor
    pub fn kelvin(&self, sensor: Sensor) -> f32 {
        match sensor {
            Sensor::ColdHead => self.cold_head_k,
            Sensor::FilmBurner => self.film_burner_k,
            Sensor::Mainplate => self.mainplate_k,
            Sensor::HeliumPump => self.helium_pump_k,
            Sensor::HeatSwitch => self.heat_switch_k,
        }
    }
}

/// Result of a successful poll
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Poll {
    /// The new sample
    pub sample: TemperatureSample,
    /// Outcome of a gain recalibration issued during this poll, if any
    pub recalibration: Option<Result<(), InstrumentError>>,
}

/// Reasons a poll produced no sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError {
    /// A read failed; the previous sample stays current
    Skipped {
        sensor: Sensor,
        error: InstrumentError,
    },
    /// A sensor read, or the cold-head gain recalibration, failed too many
    /// times in a row; the run must stop
    Fault {
        sensor: Sensor,
        error: InstrumentError,
    },
}

/// Sampler state carried between polls
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    recalibration: RecalibrationCounter,
    faults: ReadFaultMonitor,
    recalibration_failures: u8,
}

impl Sampler {
    /// Create a sampler for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all sensors once
    ///
    /// Reads are issued sequentially in [`Sensor::ALL`] order and the poll
    /// stops at the first failure, so a partial sample is never returned.
    pub fn poll<T: Thermometry + ?Sized>(
        &mut self,
        gateway: &mut T,
        elapsed_ms: u64,
    ) -> Result<Poll, PollError> {
        let mut readings = [0.0f32; Sensor::COUNT];

        for sensor in Sensor::ALL {
            match gateway.read_kelvin(sensor) {
                Ok(k) => {
                    self.faults.read_ok(sensor);
                    readings[sensor.index()] = k;
                }
                Err(error) => {
                    return Err(match self.faults.read_failed(sensor) {
                        SafetyStatus::Ok => PollError::Skipped { sensor, error },
                        SafetyStatus::Fault(sensor) => PollError::Fault { sensor, error },
                    });
                }
            }
        }

        let sample = TemperatureSample::from_readings(readings, elapsed_ms);

        let recalibration = if self.recalibration.observe(sample.cold_head_k) {
            let result = gateway.force_gain_recalibration();
            match result {
                Ok(()) => self.recalibration_failures = 0,
                Err(error) => {
                    self.recalibration_failures = self.recalibration_failures.saturating_add(1);
                    if self.recalibration_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        return Err(PollError::Fault {
                            sensor: Sensor::ColdHead,
                            error,
                        });
                    }
                }
            }
            Some(result)
        } else {
            None
        };

        Ok(Poll {
            sample,
            recalibration,
        })
    }

    /// Stuck-sensor counter
    pub fn recalibration(&self) -> &RecalibrationCounter {
        &self.recalibration
    }
}
