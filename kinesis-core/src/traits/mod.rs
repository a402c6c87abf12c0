//! Hardware abstraction traits
//!
//! These traits define the interface between the trajectory pipeline
//! and hardware-specific implementations.

pub mod exec;
pub mod motor;
pub mod power;

pub use exec::{Segment, SegmentExecutor, Trampoline};
pub use motor::{MotorBank, StepOutput};
pub use power::{
    PowerInterpolator, PowerOutput, PowerTable, PowerUpdate, EMPTY_POWER_TABLE,
    POWER_MAX_UPDATES,
};
