//! Configuration types
//!
//! Run thresholds, logging destination and the deferred-start schedule.

pub mod schedule;
pub mod types;

pub use schedule::{ScheduleError, TimeOfDay, SECONDS_PER_DAY, UNSET_SENTINEL};
pub use types::*;
