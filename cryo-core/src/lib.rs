//! Board-agnostic core logic for the cryogenic cooldown controller
//!
//! This crate contains all control logic that does not depend on a
//! specific instrument or runtime:
//!
//! - Instrument abstraction traits (thermometry, voltage source)
//! - Temperature sampler bookkeeping and stuck-sensor recalibration
//! - Stage 1 and Stage 2 actuator sequences
//! - Stage state machine and orchestrator
//! - Read-fault monitoring
//! - Configuration types and schedule arithmetic

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod orchestrator;
pub mod safety;
pub mod sampler;
pub mod stage;
pub mod state;
pub mod traits;
