//! Linear voltage ramp
//!
//! A ramp climbs from 0 V to its target in a fixed number of equal steps,
//! one per tick. Step `n` is `n * step` computed from scratch rather than
//! accumulated, and the last step lands exactly on the target.

/// Fixed-duration linear ramp
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearRamp {
    target_v: f32,
    steps: u32,
    taken: u32,
}

impl LinearRamp {
    /// Ramp to `target_v` in `steps` ticks
    pub const fn new(target_v: f32, steps: u32) -> Self {
        Self {
            target_v,
            steps,
            taken: 0,
        }
    }

    /// Voltage increment per step
    pub fn step_v(&self) -> f32 {
        if self.steps == 0 {
            return self.target_v;
        }
        self.target_v / self.steps as f32
    }

    /// Advance one step
    ///
    /// Returns the new setpoint, or `None` once the target has been reached.
    pub fn next_setpoint(&mut self) -> Option<f32> {
        if self.is_complete() {
            return None;
        }
        self.taken += 1;
        if self.taken >= self.steps {
            return Some(self.target_v);
        }
        let v = self.step_v() * self.taken as f32;
        Some(if v > self.target_v { self.target_v } else { v })
    }

    /// Whether the target has been reached
    pub fn is_complete(&self) -> bool {
        self.taken >= self.steps
    }

    /// Steps taken so far
    pub fn steps_taken(&self) -> u32 {
        self.taken
    }

    /// Target voltage
    pub fn target_v(&self) -> f32 {
        self.target_v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_target_exactly() {
        let mut ramp = LinearRamp::new(25.0, 300);
        let mut last = 0.0;
        let mut steps = 0;
        while let Some(v) = ramp.next_setpoint() {
            assert!(v > last, "ramp must be strictly increasing");
            assert!(v <= 25.0);
            last = v;
            steps += 1;
        }
        assert_eq!(steps, 300);
        assert_eq!(last, 25.0);
        assert!(ramp.is_complete());
    }

    #[test]
    fn test_first_step_is_one_increment() {
        let mut ramp = LinearRamp::new(6.0, 300);
        assert_eq!(ramp.next_setpoint(), Some(6.0 / 300.0));
        assert_eq!(ramp.steps_taken(), 1);
    }

    #[test]
    fn test_complete_ramp_yields_nothing() {
        let mut ramp = LinearRamp::new(6.0, 2);
        assert_eq!(ramp.next_setpoint(), Some(3.0));
        assert_eq!(ramp.next_setpoint(), Some(6.0));
        assert_eq!(ramp.next_setpoint(), None);
    }
}
