//! Real-time stepper scheduling
//!
//! The [`StepperScheduler`] runs in the tick context and hands prepared
//! moves to the motors on segment boundaries. The trampoline context
//! talks to it only through the [`StepperPort`] trait.

pub mod port;
pub mod scheduler;

pub use port::StepperPort;
pub use scheduler::{SchedulerStatus, StepperScheduler};
