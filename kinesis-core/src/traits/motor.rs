//! Motor traits
//!
//! A motor moves in fixed-length segments. The scheduler prepares the next
//! segment while the current one runs, then loads it on a segment boundary:
//!
//! ```text
//! prep_move(target) ──▶ [prepared] ──load_move()──▶ [running] ──end_move()
//! ```

use crate::error::Fault;

/// Trait for a step/direction pulse generator
///
/// One implementation drives one motor. Pulses must be spread evenly over
/// the requested duration so consecutive segments join without gaps.
pub trait StepOutput {
    /// Start emitting `steps` pulses over `duration_us` microseconds
    ///
    /// Replaces any pulse train still running.
    fn start(&mut self, steps: u32, forward: bool, duration_us: u32);

    /// Stop emitting pulses
    fn stop(&mut self);

    /// Enable or disable the driver stage
    ///
    /// When disabled, the motor does not hold position.
    fn enable(&mut self, enabled: bool);

    /// Most pulses that fit in `duration_us` microseconds
    ///
    /// A longer train would still be running when the next one replaces it.
    fn max_steps(&self, _duration_us: u32) -> u32 {
        u32::MAX
    }
}

/// Trait for the full set of motors on a machine
///
/// Motors are addressed by index. Each motor follows one axis of the
/// position vector.
pub trait MotorBank {
    /// Number of motors
    fn motor_count(&self) -> usize;

    /// Axis index the motor follows
    fn axis(&self, motor: usize) -> usize;

    /// Prepare a move to an absolute axis position
    ///
    /// Fails without touching the motor if the move cannot be executed
    /// exactly.
    fn prep_move(&mut self, motor: usize, target: f32) -> Result<(), Fault>;

    /// Start the prepared move
    fn load_move(&mut self, motor: usize);

    /// Stop whatever the motor is doing
    fn end_move(&mut self, motor: usize);

    /// Stop all motors
    fn end_all(&mut self) {
        for motor in 0..self.motor_count() {
            self.end_move(motor);
        }
    }

    /// Start the prepared move on all motors
    fn load_all(&mut self) {
        for motor in 0..self.motor_count() {
            self.load_move(motor);
        }
    }
}
