//! Motor driver implementations

pub mod step;

pub use step::{StepMotor, StepMotors};
