//! Spindle and laser power
//!
//! - [`PwmSpindle`]: applies power levels to a PWM channel
//! - [`SyncPower`]: places queued power changes at distances along a move

pub mod pwm;
pub mod sync;

pub use pwm::PwmSpindle;
pub use sync::{SyncPower, MAX_BREAKPOINTS};
