//! Cooldown stage state machine
//!
//! Exactly one [`StageState`] is current. Only the orchestrator moves it,
//! and only through [`StageState::transition`].

pub mod events;
pub mod machine;

pub use events::CooldownEvent;
pub use machine::StageState;
