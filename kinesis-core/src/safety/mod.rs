//! Safety handling
//!
//! Every runtime contract violation ends in the emergency stop.

pub mod estop;

pub use estop::EStop;
