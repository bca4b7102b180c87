//! Instrument gateway traits
//!
//! The fridge is driven by two instruments: a dual-channel voltage source
//! feeding the pump heater and heat switch, and a thermometry multiplexer
//! carrying the resistance bridges. The wire commands for either are the
//! implementor's concern.

use core::fmt;

/// Thermometer channels, in the order the sampler polls them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sensor {
    /// Cold head of the cryocooler (primary feedback, AC bridge)
    ColdHead,
    /// Film burner
    FilmBurner,
    /// Mainplate
    Mainplate,
    /// Helium-4 sorption pump
    HeliumPump,
    /// Gas-gap heat switch
    HeatSwitch,
}

impl Sensor {
    /// Number of thermometer channels
    pub const COUNT: usize = 5;

    /// All sensors in fixed polling order
    pub const ALL: [Sensor; Self::COUNT] = [
        Sensor::ColdHead,
        Sensor::FilmBurner,
        Sensor::Mainplate,
        Sensor::HeliumPump,
        Sensor::HeatSwitch,
    ];

    /// Position of this sensor in [`Sensor::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Sensor::ColdHead => 0,
            Sensor::FilmBurner => 1,
            Sensor::Mainplate => 2,
            Sensor::HeliumPump => 3,
            Sensor::HeatSwitch => 4,
        }
    }

    /// Human-readable label
    pub const fn label(self) -> &'static str {
        match self {
            Sensor::ColdHead => "cold head",
            Sensor::FilmBurner => "film burner",
            Sensor::Mainplate => "mainplate",
            Sensor::HeliumPump => "He pump",
            Sensor::HeatSwitch => "heat switch",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Voltage source output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputChannel {
    /// Channel 1: helium pump heater, owned by Stage 1
    PumpHeater,
    /// Channel 2: heat switch drive, owned by Stage 2
    HeatSwitch,
}

impl OutputChannel {
    /// Both channels, in channel-number order
    pub const ALL: [OutputChannel; 2] = [OutputChannel::PumpHeater, OutputChannel::HeatSwitch];

    /// Channel number as printed on the front panel
    pub const fn number(self) -> u8 {
        match self {
            OutputChannel::PumpHeater => 1,
            OutputChannel::HeatSwitch => 2,
        }
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.number())
    }
}

/// Errors reported by an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstrumentError {
    /// The instrument did not answer in time
    Timeout,
    /// The instrument answered with something that is not a reading
    MalformedReply,
    /// The transport to the instrument is gone
    Disconnected,
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentError::Timeout => f.write_str("hardware timeout"),
            InstrumentError::MalformedReply => f.write_str("malformed instrument reply"),
            InstrumentError::Disconnected => f.write_str("instrument disconnected"),
        }
    }
}

/// Thermometry multiplexer
///
/// Not assumed safe for concurrent queries; callers serialize reads.
pub trait Thermometry {
    /// Read one thermometer in Kelvin
    fn read_kelvin(&mut self, sensor: Sensor) -> Result<f32, InstrumentError>;

    /// Force the bridge amplifier to re-run its gain selection
    ///
    /// Used when the cold-head reading appears stuck (amplifier saturation).
    fn force_gain_recalibration(&mut self) -> Result<(), InstrumentError>;
}

/// Dual-channel voltage source
pub trait VoltageSource {
    /// Program the voltage setpoint of a channel
    fn set_voltage(&mut self, channel: OutputChannel, volts: f32) -> Result<(), InstrumentError>;

    /// Switch a channel's output on or off
    fn set_output_enabled(
        &mut self,
        channel: OutputChannel,
        enabled: bool,
    ) -> Result<(), InstrumentError>;
}

/// Both instruments behind one gateway handle
pub trait Instrument: Thermometry + VoltageSource {}

impl<T: Thermometry + VoltageSource + ?Sized> Instrument for T {}

/// Number of attempts made for a single gateway call before giving up
pub const MAX_ATTEMPTS: u8 = 3;

/// Run a gateway call up to [`MAX_ATTEMPTS`] times
///
/// Returns the first success, or the error from the final attempt.
pub fn with_retries<T, F>(mut call: F) -> Result<T, InstrumentError>
where
    F: FnMut() -> Result<T, InstrumentError>,
{
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= MAX_ATTEMPTS => return Err(e),
            Err(_) => attempt += 1,
        }
    }
}

/// Force a channel to 0 V and switch it off
///
/// Both commands are retried. The output is disabled even if the voltage
/// setpoint could not be written; the first error is reported.
pub fn de_energize<V: VoltageSource + ?Sized>(
    source: &mut V,
    channel: OutputChannel,
) -> Result<(), InstrumentError> {
    let volts = with_retries(|| source.set_voltage(channel, 0.0));
    let output = with_retries(|| source.set_output_enabled(channel, false));
    volts.and(output)
}
