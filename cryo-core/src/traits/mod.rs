//! Hardware abstraction traits
//!
//! These traits define the interface between the cooldown logic
//! and the instrument drivers.

pub mod instrument;

pub use instrument::{
    de_energize, with_retries, Instrument, InstrumentError, OutputChannel, Sensor, Thermometry,
    VoltageSource, MAX_ATTEMPTS,
};
