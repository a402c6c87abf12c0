//! Step/direction motor
//!
//! Converts absolute axis targets into signed step counts and hands them
//! to a pulse generator one segment at a time. Positions are tracked in
//! whole microsteps so rounding never accumulates.
//!
//! ```ignore
//! let motors = StepMotors([
//!     StepMotor::new(x_output, &config.motors[0], config.segment_time_us()),
//!     StepMotor::new(y_output, &config.motors[1], config.segment_time_us()),
//! ]);
//! let scheduler = StepperScheduler::new(motors, spindle, &config);
//! ```

use core::ops::{Index, IndexMut};

use num_traits::float::Float;

use kinesis_core::config::MotorConfig;
use kinesis_core::traits::{MotorBank, StepOutput};
use kinesis_core::Fault;

/// One step/direction motor
pub struct StepMotor<O> {
    output: O,
    axis: usize,
    steps_per_unit: f32,
    reverse: bool,
    segment_time_us: u32,
    /// Step position after the last loaded move
    position: i32,
    /// Step position after the last prepared move
    prep_position: i32,
    /// Signed steps of the prepared move
    prepared: Option<i32>,
    enabled: bool,
}

impl<O: StepOutput> StepMotor<O> {
    /// Create a motor at step position zero
    ///
    /// # Arguments
    /// - `output`: Pulse generator for this motor
    /// - `config`: Axis mapping and scaling
    /// - `segment_time_us`: Duration of every loaded move
    pub fn new(output: O, config: &MotorConfig, segment_time_us: u32) -> Self {
        Self {
            output,
            axis: config.axis as usize,
            steps_per_unit: config.steps_per_unit,
            reverse: config.reverse,
            segment_time_us,
            position: 0,
            prep_position: 0,
            prepared: None,
            enabled: false,
        }
    }

    /// Step position of the last loaded move
    pub fn position_steps(&self) -> i32 {
        self.position
    }

    /// Axis position of the last loaded move
    pub fn position(&self) -> f32 {
        self.position as f32 / self.steps_per_unit
    }

    /// Check if the driver stage is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pulse generator
    pub fn output(&self) -> &O {
        &self.output
    }

    fn to_steps(&self, position: f32) -> Result<i32, Fault> {
        let steps = (position * self.steps_per_unit).round();
        // `as i64` saturates, so anything past the i32 range fails below
        i32::try_from(steps as i64).map_err(|_| Fault::PositionOverflow)
    }

    /// Prepare a move to `target`
    ///
    /// Fails if the target has no step position or the move is too fast
    /// to emit within one segment. Nothing changes on failure.
    pub fn prep_move(&mut self, target: f32) -> Result<(), Fault> {
        let target_steps = self.to_steps(target)?;
        let steps = target_steps
            .checked_sub(self.prep_position)
            .ok_or(Fault::PositionOverflow)?;
        if self.output.max_steps(self.segment_time_us) < steps.unsigned_abs() {
            return Err(Fault::StepRateExceeded);
        }

        self.prep_position = target_steps;
        self.prepared = Some(steps);

        if steps != 0 && !self.enabled {
            self.output.enable(true);
            self.enabled = true;
        }
        Ok(())
    }

    /// Start the prepared move
    pub fn load_move(&mut self) {
        match self.prepared.take() {
            Some(steps) if steps != 0 => {
                let forward = (steps > 0) != self.reverse;
                self.output
                    .start(steps.unsigned_abs(), forward, self.segment_time_us);
                self.position = self.prep_position;
            }
            _ => self.output.stop(),
        }
    }

    /// Stop pulsing
    pub fn end_move(&mut self) {
        self.output.stop();
    }
}

/// A fixed set of step motors driven as one bank
pub struct StepMotors<O, const N: usize>(pub [StepMotor<O>; N]);

impl<O, const N: usize> Index<usize> for StepMotors<O, N> {
    type Output = StepMotor<O>;

    fn index(&self, motor: usize) -> &StepMotor<O> {
        &self.0[motor]
    }
}

impl<O, const N: usize> IndexMut<usize> for StepMotors<O, N> {
    fn index_mut(&mut self, motor: usize) -> &mut StepMotor<O> {
        &mut self.0[motor]
    }
}

impl<O: StepOutput, const N: usize> MotorBank for StepMotors<O, N> {
    fn motor_count(&self) -> usize {
        N
    }

    fn axis(&self, motor: usize) -> usize {
        self[motor].axis
    }

    fn prep_move(&mut self, motor: usize, target: f32) -> Result<(), Fault> {
        self[motor].prep_move(target)
    }

    fn load_move(&mut self, motor: usize) {
        self[motor].load_move();
    }

    fn end_move(&mut self, motor: usize) {
        self[motor].end_move();
    }
}
