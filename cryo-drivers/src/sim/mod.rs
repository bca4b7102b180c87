//! Simulated refrigerator
//!
//! Implements the instrument traits on top of [`ThermalModel`] so the
//! controller can run a full cooldown without hardware. The model advances
//! one step each time the cold head is read, which is the first read of
//! every sampler poll.
//!
//! Faults can be injected for testing: failing reads and writes, and a
//! saturated cold-head amplifier that freezes the reading until the gain is
//! recalibrated.

pub mod thermal;

pub use thermal::{OutputState, ThermalModel, BATH_K, INITIAL_TEMPS_K};

use cryo_core::traits::{InstrumentError, OutputChannel, Sensor, Thermometry, VoltageSource};

/// Default model step per poll (s)
pub const DEFAULT_STEP_S: f32 = 1.0;

/// Peak reading noise (K)
const NOISE_K: f32 = 0.0005;

/// Pseudo-random noise source (xorshift)
#[derive(Debug, Clone)]
struct Noise(u32);

impl Noise {
    fn next(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        // Map to [-1, 1]
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Simulated fridge with fault injection
#[derive(Debug, Clone)]
pub struct SimulatedFridge {
    model: ThermalModel,
    step_s: f32,
    noise: Option<Noise>,
    /// Frozen cold-head value while the amplifier is saturated
    saturated: Option<f32>,
    saturate_after: Option<u32>,
    failing_reads: [u8; Sensor::COUNT],
    failing_writes: [u8; 2],
    polls: u32,
    recalibrations: u32,
}

impl Default for SimulatedFridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFridge {
    /// Create a fridge at its initial temperatures with reading noise
    pub fn new() -> Self {
        Self::with_model(ThermalModel::default())
    }

    /// Create a fridge around an existing model
    pub fn with_model(model: ThermalModel) -> Self {
        Self {
            model,
            step_s: DEFAULT_STEP_S,
            noise: Some(Noise(0x2545_f491)),
            saturated: None,
            saturate_after: None,
            failing_reads: [0; Sensor::COUNT],
            failing_writes: [0; 2],
            polls: 0,
            recalibrations: 0,
        }
    }

    /// Set the model step taken per poll (s)
    pub fn with_step(mut self, step_s: f32) -> Self {
        self.step_s = step_s;
        self
    }

    /// Disable reading noise so readings are exact model values
    pub fn without_noise(mut self) -> Self {
        self.noise = None;
        self
    }

    /// The underlying model
    pub fn model(&self) -> &ThermalModel {
        &self.model
    }

    /// Output state of a channel
    pub fn output(&self, channel: OutputChannel) -> OutputState {
        self.model.output(channel)
    }

    /// Number of gain recalibrations received
    pub fn recalibrations(&self) -> u32 {
        self.recalibrations
    }

    /// Whether the cold-head amplifier is currently saturated
    pub fn is_saturated(&self) -> bool {
        self.saturated.is_some()
    }

    /// Saturate the cold-head amplifier after `polls` more polls
    pub fn saturate_cold_head_after(&mut self, polls: u32) {
        self.saturate_after = Some(self.polls.saturating_add(polls));
    }

    /// Make the next `count` reads of `sensor` time out
    pub fn fail_reads(&mut self, sensor: Sensor, count: u8) {
        self.failing_reads[sensor.index()] = count;
    }

    /// Make the next `count` writes to `channel` time out
    pub fn fail_writes(&mut self, channel: OutputChannel, count: u8) {
        self.failing_writes[channel_slot(channel)] = count;
    }

    fn poll_started(&mut self) {
        self.polls = self.polls.saturating_add(1);
        self.model.step(self.step_s);

        if self.saturate_after.is_some_and(|at| self.polls > at) {
            self.saturate_after = None;
            self.saturated = Some(self.model.temperature(Sensor::ColdHead));
        }
    }

    fn take_write_failure(&mut self, channel: OutputChannel) -> Result<(), InstrumentError> {
        let remaining = &mut self.failing_writes[channel_slot(channel)];
        if *remaining > 0 {
            *remaining -= 1;
            return Err(InstrumentError::Timeout);
        }
        Ok(())
    }
}

fn channel_slot(channel: OutputChannel) -> usize {
    match channel {
        OutputChannel::PumpHeater => 0,
        OutputChannel::HeatSwitch => 1,
    }
}

impl Thermometry for SimulatedFridge {
    fn read_kelvin(&mut self, sensor: Sensor) -> Result<f32, InstrumentError> {
        if sensor == Sensor::ColdHead {
            self.poll_started();
        }

        let remaining = &mut self.failing_reads[sensor.index()];
        if *remaining > 0 {
            *remaining -= 1;
            return Err(InstrumentError::Timeout);
        }

        if sensor == Sensor::ColdHead {
            if let Some(frozen) = self.saturated {
                return Ok(frozen);
            }
        }

        let noise = self.noise.as_mut().map_or(0.0, |n| n.next() * NOISE_K);
        Ok(self.model.temperature(sensor) + noise)
    }

    fn force_gain_recalibration(&mut self) -> Result<(), InstrumentError> {
        self.recalibrations = self.recalibrations.saturating_add(1);
        self.saturated = None;
        Ok(())
    }
}

impl VoltageSource for SimulatedFridge {
    fn set_voltage(&mut self, channel: OutputChannel, volts: f32) -> Result<(), InstrumentError> {
        self.take_write_failure(channel)?;
        self.model.output_mut(channel).volts = volts;
        Ok(())
    }

    fn set_output_enabled(
        &mut self,
        channel: OutputChannel,
        enabled: bool,
    ) -> Result<(), InstrumentError> {
        self.take_write_failure(channel)?;
        self.model.output_mut(channel).enabled = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryo_core::sampler::{PollError, Sampler};
    use cryo_core::traits::de_energize;

    #[test]
    fn test_outputs_start_de_energized() {
        let fridge = SimulatedFridge::new();
        for channel in OutputChannel::ALL {
            assert!(fridge.output(channel).is_de_energized());
        }
    }

    #[test]
    fn test_noise_makes_readings_jitter() {
        let mut fridge = SimulatedFridge::new().with_step(0.0);
        let a = fridge.read_kelvin(Sensor::ColdHead).unwrap();
        let b = fridge.read_kelvin(Sensor::ColdHead).unwrap();
        assert_ne!(a, b);
        assert!((a - b).abs() <= 2.0 * NOISE_K);
    }

    #[test]
    fn test_saturation_cleared_by_recalibration() {
        let mut fridge = SimulatedFridge::new();
        let mut sampler = Sampler::new();
        fridge.saturate_cold_head_after(2);

        let mut recalibrated_at = None;
        for tick in 0..20u64 {
            let poll = sampler.poll(&mut fridge, tick * 1000).unwrap();
            if poll.recalibration.is_some() {
                recalibrated_at = Some(tick);
                break;
            }
        }
        // Frozen from the third poll; seventh identical reading recalibrates
        assert_eq!(recalibrated_at, Some(8));
        assert_eq!(fridge.recalibrations(), 1);
        assert!(!fridge.is_saturated());
    }

    #[test]
    fn test_injected_read_failures() {
        let mut fridge = SimulatedFridge::new();
        let mut sampler = Sampler::new();
        fridge.fail_reads(Sensor::HeliumPump, 3);

        assert!(matches!(
            sampler.poll(&mut fridge, 0),
            Err(PollError::Skipped { .. })
        ));
        assert!(matches!(
            sampler.poll(&mut fridge, 1000),
            Err(PollError::Skipped { .. })
        ));
        assert!(matches!(
            sampler.poll(&mut fridge, 2000),
            Err(PollError::Fault {
                sensor: Sensor::HeliumPump,
                ..
            })
        ));
        assert!(sampler.poll(&mut fridge, 3000).is_ok());
    }

    #[test]
    fn test_de_energize_retries_through_transient_write_failure() {
        let mut fridge = SimulatedFridge::new();
        fridge.set_voltage(OutputChannel::PumpHeater, 12.0).unwrap();
        fridge
            .set_output_enabled(OutputChannel::PumpHeater, true)
            .unwrap();

        fridge.fail_writes(OutputChannel::PumpHeater, 2);
        assert_eq!(de_energize(&mut fridge, OutputChannel::PumpHeater), Ok(()));
        assert!(fridge.output(OutputChannel::PumpHeater).is_de_energized());
    }

    #[test]
    fn test_persistent_write_failure_surfaces() {
        let mut fridge = SimulatedFridge::new();
        fridge.fail_writes(OutputChannel::HeatSwitch, 10);
        assert_eq!(
            de_energize(&mut fridge, OutputChannel::HeatSwitch),
            Err(InstrumentError::Timeout)
        );
    }
}
