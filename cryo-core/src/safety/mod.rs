//! Safety monitoring
//!
//! Detects fault conditions that have to stop a cooldown.

pub mod monitor;

pub use monitor::{ReadFaultMonitor, SafetyStatus, MAX_CONSECUTIVE_READ_FAILURES};
