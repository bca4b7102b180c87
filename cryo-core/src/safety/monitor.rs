//! Read failure monitor
//!
//! A single failed read is a transient hardware timeout. Repeated failures
//! on the same sensor mean the bridge or the bus is gone, and the run has to
//! stop.

use crate::traits::Sensor;

/// Consecutive failures on one sensor before the run is faulted
pub const MAX_CONSECUTIVE_READ_FAILURES: u8 = 3;

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// A sensor failed too many times in a row
    Fault(Sensor),
}

/// Tracks consecutive read failures per sensor path
#[derive(Debug, Clone, Default)]
pub struct ReadFaultMonitor {
    consecutive_failures: [u8; Sensor::COUNT],
}

impl ReadFaultMonitor {
    /// Create a monitor with clean counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful read
    pub fn read_ok(&mut self, sensor: Sensor) {
        self.consecutive_failures[sensor.index()] = 0;
    }

    /// Record a failed read and return the resulting status
    pub fn read_failed(&mut self, sensor: Sensor) -> SafetyStatus {
        let count = &mut self.consecutive_failures[sensor.index()];
        *count = count.saturating_add(1);
        self.check()
    }

    /// Check all counters
    ///
    /// Returns the first faulted sensor in polling order.
    pub fn check(&self) -> SafetyStatus {
        Sensor::ALL
            .iter()
            .find(|s| self.consecutive_failures[s.index()] >= MAX_CONSECUTIVE_READ_FAILURES)
            .map_or(SafetyStatus::Ok, |s| SafetyStatus::Fault(*s))
    }

    /// Current consecutive failure count for a sensor
    pub fn failures(&self, sensor: Sensor) -> u8 {
        self.consecutive_failures[sensor.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_operation() {
        let mut monitor = ReadFaultMonitor::new();
        for sensor in Sensor::ALL {
            monitor.read_ok(sensor);
        }
        assert_eq!(monitor.check(), SafetyStatus::Ok);
    }

    #[test]
    fn test_third_failure_faults() {
        let mut monitor = ReadFaultMonitor::new();
        assert_eq!(monitor.read_failed(Sensor::Mainplate), SafetyStatus::Ok);
        assert_eq!(monitor.read_failed(Sensor::Mainplate), SafetyStatus::Ok);
        assert_eq!(
            monitor.read_failed(Sensor::Mainplate),
            SafetyStatus::Fault(Sensor::Mainplate)
        );
    }

    #[test]
    fn test_success_resets_counter() {
        let mut monitor = ReadFaultMonitor::new();
        monitor.read_failed(Sensor::ColdHead);
        monitor.read_failed(Sensor::ColdHead);
        monitor.read_ok(Sensor::ColdHead);
        assert_eq!(monitor.failures(Sensor::ColdHead), 0);
        assert_eq!(monitor.read_failed(Sensor::ColdHead), SafetyStatus::Ok);
    }

    #[test]
    fn test_failures_on_different_sensors_do_not_add_up() {
        let mut monitor = ReadFaultMonitor::new();
        monitor.read_failed(Sensor::ColdHead);
        monitor.read_failed(Sensor::HeliumPump);
        assert_eq!(monitor.read_failed(Sensor::HeatSwitch), SafetyStatus::Ok);
    }
}
