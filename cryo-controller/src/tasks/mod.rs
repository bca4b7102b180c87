//! Long-lived control loops
//!
//! Each loop runs as its own embassy task for the life of the process and
//! communicates through the run context. Loops are started and cancelled
//! per run; they are never respawned.

pub mod controller;
pub mod sampler;
pub mod stage;

pub use controller::controller_task;
pub use sampler::sampler_task;
pub use stage::{stage1_task, stage2_task};
