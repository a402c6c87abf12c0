//! Exec layer traits

use kinesis_protocol::Axes;

use super::power::PowerTable;
use crate::error::Fault;

/// One interpolated motion target
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Segment duration in seconds
    pub time: f32,
    /// Absolute position at the end of the segment
    pub target: Axes,
    /// Velocity at the end of the segment
    pub velocity: f32,
    /// Acceleration at the end of the segment
    pub accel: f32,
    /// Acceleration limit of the owning line
    pub max_accel: f32,
    /// Jerk limit of the owning line
    pub max_jerk: f32,
}

/// Trait for the consumer of generated segments
pub trait SegmentExecutor {
    /// Current velocity
    fn velocity(&self) -> f32;

    /// Record the jerk of the phase being entered
    fn set_jerk(&mut self, jerk: f32);

    /// Hand one segment and its power table to the stepper scheduler
    fn segment(&mut self, segment: &Segment, power: &PowerTable) -> Result<(), Fault>;
}

/// Trait for requesting the low-priority move worker
///
/// Triggering must be cheap and safe to call from the tick context.
pub trait Trampoline {
    /// Schedule one run of the request-completion worker
    fn trigger(&self);
}
