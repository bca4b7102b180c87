//! Stuck cold-head detection
//!
//! When the bridge amplifier saturates the cold-head reading freezes at one
//! value. A real thermometer at these temperatures always jitters in the
//! last digit, so a run of identical readings means the gain has to be
//! re-selected.

/// Repeats after the first reading before the gain is recalibrated
pub const RECALIBRATION_REPEATS: u8 = 5;

/// Counts consecutive identical cold-head readings
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecalibrationCounter {
    last_cold_head_k: Option<f32>,
    repeat_count: u8,
}

impl RecalibrationCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one cold-head reading
    ///
    /// Returns `true` when a recalibration should be issued. The counter is
    /// reset at that point.
    pub fn observe(&mut self, cold_head_k: f32) -> bool {
        // Exact comparison: the reading is only suspect if it is bit-identical
        if self.last_cold_head_k == Some(cold_head_k) {
            self.repeat_count = self.repeat_count.saturating_add(1);
        } else {
            self.last_cold_head_k = Some(cold_head_k);
            self.repeat_count = 0;
        }

        if self.repeat_count > RECALIBRATION_REPEATS {
            self.repeat_count = 0;
            return true;
        }
        false
    }

    /// Last cold-head value seen
    pub fn last_value(&self) -> Option<f32> {
        self.last_cold_head_k
    }

    /// Current number of repeats
    pub fn repeat_count(&self) -> u8 {
        self.repeat_count
    }
}
