//! RP2040-specific HAL for the motion controller firmware
//!
//! Provides the RP2040 implementation of the core step output trait:
//!
//! - PIO program that emits a counted, evenly spaced pulse train
//! - PIO stepper driver with direction and enable GPIOs

#![no_std]

pub mod pio;
pub mod stepper;

pub use stepper::{PioStepper, StepChannel, StepProgram};
