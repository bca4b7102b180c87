//! Deferred start arithmetic
//!
//! Times of day are whole seconds since midnight. The wall clock itself is
//! read by the host; this module only parses and subtracts.

use core::fmt;

/// Seconds in a day
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Placeholder shown in the settings before a time has been entered
pub const UNSET_SENTINEL: &str = "hh:mm:ss";

/// Scheduled start errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Schedule enabled but the time was never entered
    Unset,
    /// Not of the form `hh:mm:ss`
    Malformed,
    /// Hour, minute or second out of range
    OutOfRange,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Unset => f.write_str("no start time entered"),
            ScheduleError::Malformed => f.write_str("start time must be hh:mm:ss"),
            ScheduleError::OutOfRange => f.write_str("start time out of range"),
        }
    }
}

/// Wall-clock time of day, second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    seconds: u32,
}

impl TimeOfDay {
    /// Midnight
    pub const MIDNIGHT: Self = Self { seconds: 0 };

    /// Build from hours, minutes and seconds
    pub const fn from_hms(h: u32, m: u32, s: u32) -> Result<Self, ScheduleError> {
        if h >= 24 || m >= 60 || s >= 60 {
            return Err(ScheduleError::OutOfRange);
        }
        Ok(Self {
            seconds: h * 3600 + m * 60 + s,
        })
    }

    /// Build from seconds since midnight
    pub const fn from_seconds(seconds: u32) -> Result<Self, ScheduleError> {
        if seconds >= SECONDS_PER_DAY {
            return Err(ScheduleError::OutOfRange);
        }
        Ok(Self { seconds })
    }

    /// Seconds since midnight
    pub const fn seconds(self) -> u32 {
        self.seconds
    }

    /// Parse `hh:mm:ss`
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let text = text.trim();
        if text == UNSET_SENTINEL {
            return Err(ScheduleError::Unset);
        }

        let bytes = text.as_bytes();
        if bytes.len() != 8 || bytes[2] != b':' || bytes[5] != b':' {
            return Err(ScheduleError::Malformed);
        }

        let h = two_digits(bytes[0], bytes[1])?;
        let m = two_digits(bytes[3], bytes[4])?;
        let s = two_digits(bytes[6], bytes[7])?;
        Self::from_hms(h, m, s)
    }

    /// Seconds to wait from `self` until `target`
    ///
    /// A target earlier in the day than now means tomorrow. Equal times
    /// start immediately.
    pub const fn seconds_until(self, target: TimeOfDay) -> u32 {
        if target.seconds < self.seconds {
            (SECONDS_PER_DAY - self.seconds) + target.seconds
        } else {
            target.seconds - self.seconds
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.seconds / 3600,
            (self.seconds / 60) % 60,
            self.seconds % 60
        )
    }
}

fn two_digits(tens: u8, ones: u8) -> Result<u32, ScheduleError> {
    if !tens.is_ascii_digit() || !ones.is_ascii_digit() {
        return Err(ScheduleError::Malformed);
    }
    Ok(u32::from(tens - b'0') * 10 + u32::from(ones - b'0'))
}
