//! Board-agnostic core logic for the motion controller firmware
//!
//! This crate contains everything between the serial command line and the
//! step generator that does not depend on specific hardware:
//!
//! - Hardware abstraction traits (motors, power output, trampoline)
//! - Line compiler and S-curve segment generator
//! - Exec layer and command queue
//! - Real-time stepper scheduler
//! - Emergency stop latch
//! - Configuration type definitions
//!
//! Two execution contexts share this code. The *tick* runs at a fixed
//! period and never blocks; it owns the [`stepper::StepperScheduler`]. The
//! *trampoline* runs at a lower priority whenever the tick requests the
//! next move, and drives the [`exec::Executor`].

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod exec;
pub mod motion;
pub mod safety;
pub mod stepper;
pub mod traits;

pub use error::{CommandError, Fault};
