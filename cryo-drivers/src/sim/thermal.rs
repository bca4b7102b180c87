//! Lumped thermal model
//!
//! Each node relaxes toward an equilibrium temperature set by the two
//! outputs. Good enough to walk a run through both stages; not a physical
//! model of a sorption fridge.

use cryo_core::traits::{OutputChannel, Sensor};

/// Starting temperatures in [`Sensor::ALL`] order (K)
pub const INITIAL_TEMPS_K: [f32; Sensor::COUNT] = [40.0, 42.0, 45.0, 12.0, 10.0];

/// Bath temperature the stages settle to with nothing energized (K)
pub const BATH_K: f32 = 4.0;

/// Pump equilibrium temperature against heater voltage
///
/// Table format: (volts, kelvin), ascending. Interpolated linearly and
/// clamped at both ends.
const PUMP_EQUILIBRIUM: &[(f32, f32)] = &[
    (0.0, BATH_K),
    (2.5, 50.0), // hold voltage sits just above the hold band
    (10.0, 56.0),
    (25.0, 62.0),
];

/// Heat switch temperature per volt on its heater (K/V)
const SWITCH_K_PER_V: f32 = 3.0;

/// Pump temperature above which helium desorbs onto the cold head (K)
const DESORPTION_K: f32 = 40.0;

/// Heat switch temperature above which it conducts (K)
const SWITCH_CLOSED_K: f32 = 15.0;

/// Relaxation rates (fraction of the gap closed per second)
const PUMP_RATE: f32 = 0.02;
const SWITCH_RATE: f32 = 0.05;
const COLD_HEAD_RATE: f32 = 0.008;
const PLATE_RATE: f32 = 0.01;

/// State of one voltage output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputState {
    /// Programmed setpoint (V)
    pub volts: f32,
    /// Output switched on
    pub enabled: bool,
}

impl OutputState {
    /// Voltage actually delivered
    pub fn delivered(&self) -> f32 {
        if self.enabled {
            self.volts
        } else {
            0.0
        }
    }

    /// Whether the output is at 0 V and off
    pub fn is_de_energized(&self) -> bool {
        !self.enabled && self.volts == 0.0
    }
}

/// Node temperatures and output states
#[derive(Debug, Clone)]
pub struct ThermalModel {
    temps_k: [f32; Sensor::COUNT],
    outputs: [OutputState; 2],
}

impl Default for ThermalModel {
    fn default() -> Self {
        Self::new(INITIAL_TEMPS_K)
    }
}

fn relax(current: f32, target: f32, rate: f32, dt_s: f32) -> f32 {
    let fraction = (rate * dt_s).min(1.0);
    current + (target - current) * fraction
}

impl ThermalModel {
    /// Create a model starting from the given temperatures
    pub fn new(temps_k: [f32; Sensor::COUNT]) -> Self {
        Self {
            temps_k,
            outputs: [OutputState::default(); 2],
        }
    }

    /// Current temperature of a node
    pub fn temperature(&self, sensor: Sensor) -> f32 {
        self.temps_k[sensor.index()]
    }

    /// Output state of a channel
    pub fn output(&self, channel: OutputChannel) -> OutputState {
        self.outputs[channel_index(channel)]
    }

    /// Mutable output state of a channel
    pub fn output_mut(&mut self, channel: OutputChannel) -> &mut OutputState {
        &mut self.outputs[channel_index(channel)]
    }

    /// Advance the model by `dt_s` seconds
    pub fn step(&mut self, dt_s: f32) {
        let pump_v = self.output(OutputChannel::PumpHeater).delivered();
        let switch_v = self.output(OutputChannel::HeatSwitch).delivered();

        let pump = self.temps_k[Sensor::HeliumPump.index()];
        let switch = self.temps_k[Sensor::HeatSwitch.index()];

        let pump_target = pump_equilibrium_k(pump_v);
        let switch_target = BATH_K + SWITCH_K_PER_V * switch_v;

        // Condensed helium cools the head; a closed switch pumps on it
        let cold_head_target = if switch > SWITCH_CLOSED_K {
            0.8
        } else if pump > DESORPTION_K {
            3.6
        } else {
            6.0
        };

        let cold_head = self.temps_k[Sensor::ColdHead.index()];
        let targets = [
            (Sensor::HeliumPump, pump_target, PUMP_RATE),
            (Sensor::HeatSwitch, switch_target, SWITCH_RATE),
            (Sensor::ColdHead, cold_head_target, COLD_HEAD_RATE),
            (Sensor::FilmBurner, cold_head + 1.5, PLATE_RATE),
            (Sensor::Mainplate, cold_head + 1.0, PLATE_RATE),
        ];
        for (sensor, target, rate) in targets {
            let t = &mut self.temps_k[sensor.index()];
            *t = relax(*t, target, rate, dt_s);
        }
    }
}

/// Interpolate the pump equilibrium table
pub fn pump_equilibrium_k(volts: f32) -> f32 {
    let (first_v, first_k) = PUMP_EQUILIBRIUM[0];
    if volts <= first_v {
        return first_k;
    }
    for pair in PUMP_EQUILIBRIUM.windows(2) {
        let (v0, k0) = pair[0];
        let (v1, k1) = pair[1];
        if volts <= v1 {
            return k0 + (k1 - k0) * (volts - v0) / (v1 - v0);
        }
    }
    PUMP_EQUILIBRIUM[PUMP_EQUILIBRIUM.len() - 1].1
}

fn channel_index(channel: OutputChannel) -> usize {
    match channel {
        OutputChannel::PumpHeater => 0,
        OutputChannel::HeatSwitch => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relax_never_overshoots() {
        assert_eq!(relax(10.0, 20.0, 0.5, 4.0), 20.0);
        assert_eq!(relax(10.0, 20.0, 0.1, 1.0), 11.0);
    }

    #[test]
    fn test_pump_equilibrium_table() {
        assert_eq!(pump_equilibrium_k(-1.0), BATH_K);
        assert_eq!(pump_equilibrium_k(2.5), 50.0);
        assert_eq!(pump_equilibrium_k(17.5), 59.0);
        assert_eq!(pump_equilibrium_k(40.0), 62.0);
    }

    #[test]
    fn test_hold_voltage_straddles_band() {
        // Off: the pump cools out of the band; on at hold voltage: it
        // climbs back over the top
        assert!(pump_equilibrium_k(0.0) < 47.0);
        assert!(pump_equilibrium_k(2.5) > 48.0);
    }

    #[test]
    fn test_pump_heats_only_when_enabled() {
        let mut model = ThermalModel::default();
        model.output_mut(OutputChannel::PumpHeater).volts = 25.0;
        let before = model.temperature(Sensor::HeliumPump);
        model.step(1.0);
        assert!(model.temperature(Sensor::HeliumPump) < before);

        model.output_mut(OutputChannel::PumpHeater).enabled = true;
        for _ in 0..60 {
            model.step(1.0);
        }
        assert!(model.temperature(Sensor::HeliumPump) > 40.0);
    }

    #[test]
    fn test_cold_head_drops_once_pump_is_warm() {
        let mut model = ThermalModel::default();
        let pump = model.output_mut(OutputChannel::PumpHeater);
        pump.volts = 25.0;
        pump.enabled = true;
        for _ in 0..1200 {
            model.step(1.0);
        }
        assert!(model.temperature(Sensor::ColdHead) < 4.2);
    }
}
