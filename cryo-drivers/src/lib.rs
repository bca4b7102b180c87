//! Instrument implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in cryo-core:
//!
//! - Simulated refrigerator (thermal model, fault injection)

#![no_std]
#![deny(unsafe_code)]

pub mod sim;

pub use sim::SimulatedFridge;
