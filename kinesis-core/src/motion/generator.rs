//! S-curve segment generator
//!
//! Walks the phases of one [`LineDescriptor`] and emits one interpolated
//! target per call. The generator is resumable: all progress lives in
//! [`GeneratorState`], so each call does a bounded amount of work.
//!
//! Phase entry table (`J` = max jerk, `tₙ` = duration of phase n):
//!
//! ```text
//! phase  jerk  accel anchor
//!   0     +J      0
//!   1      0    +J·t₀
//!   2     -J    +J·t₀
//!   3      0      0
//!   4     -J      0
//!   5      0    -J·t₄
//!   6     +J    -J·t₄
//! ```
//!
//! Zero-duration phases are skipped. The last segment of a line reports
//! the exact target position and velocity so rounding never accumulates
//! across lines.

use super::line::LineDescriptor;
use super::scurve::Anchor;
use crate::error::Fault;
use crate::traits::{
    PowerInterpolator, PowerTable, Segment, SegmentExecutor, EMPTY_POWER_TABLE,
};

/// Progress through the active line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeneratorState {
    /// Line being executed
    pub line: LineDescriptor,
    /// Current phase index
    pub phase: usize,
    /// Time into the current phase
    pub t: f32,
    /// Start-of-phase distance, velocity and acceleration
    pub anchor: Anchor,
    /// Jerk of the current phase
    pub jerk: f32,
    /// Distance reported by the previous segment
    pub last_distance: f32,
}

impl GeneratorState {
    fn enter_phase<E: SegmentExecutor>(&mut self, phase: usize, exec: &mut E) {
        let max_jerk = self.line.max_jerk;

        self.phase = phase;
        self.jerk = match phase {
            0 | 6 => max_jerk,
            2 | 4 => -max_jerk,
            _ => 0.0,
        };
        exec.set_jerk(self.jerk);

        self.anchor.accel = match phase {
            1 | 2 => max_jerk * self.line.times[0],
            5 | 6 => -max_jerk * self.line.times[4],
            _ => 0.0,
        };
    }
}

/// Generator slot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveGenerator {
    /// No line is executing
    #[default]
    Idle,
    /// A line is executing
    Running(GeneratorState),
}

/// Owner of the segment generator
#[derive(Debug, Clone)]
pub struct TrajectoryEngine {
    active: ActiveGenerator,
    /// Target velocity of the most recently loaded line
    last_velocity: f32,
    /// Power updates for the segment being emitted
    power: PowerTable,
    segment_time: f32,
}

impl TrajectoryEngine {
    /// Create an idle engine emitting segments of `segment_time` seconds
    pub fn new(segment_time: f32) -> Self {
        Self {
            active: ActiveGenerator::Idle,
            last_velocity: 0.0,
            power: EMPTY_POWER_TABLE,
            segment_time,
        }
    }

    /// Current generator slot
    pub fn active(&self) -> &ActiveGenerator {
        &self.active
    }

    /// Check if a line is executing
    pub fn is_running(&self) -> bool {
        matches!(self.active, ActiveGenerator::Running(_))
    }

    /// Segment quantum in seconds
    pub fn segment_time(&self) -> f32 {
        self.segment_time
    }

    /// Load a line and start its first nonzero phase
    ///
    /// The line starts from rest unless the exec layer is still moving, in
    /// which case it continues from the previous line's target velocity.
    /// The producer must only queue moves that join at that velocity.
    ///
    /// A line without any nonzero phase leaves the generator idle.
    pub fn load<E: SegmentExecutor>(&mut self, line: LineDescriptor, exec: &mut E) {
        let initial_velocity = if exec.velocity() != 0.0 {
            self.last_velocity
        } else {
            0.0
        };
        self.last_velocity = line.target_vel;

        let Some(phase) = line.first_phase() else {
            self.active = ActiveGenerator::Idle;
            return;
        };

        let mut state = GeneratorState {
            line,
            phase,
            t: 0.0,
            anchor: Anchor {
                distance: 0.0,
                velocity: initial_velocity,
                accel: 0.0,
            },
            jerk: 0.0,
            last_distance: 0.0,
        };
        state.enter_phase(phase, exec);

        self.active = ActiveGenerator::Running(state);
    }

    /// Drop the active line
    pub fn abort(&mut self) {
        self.active = ActiveGenerator::Idle;
    }

    /// Advance by one segment quantum and emit the resulting segment
    ///
    /// Returns `Ok(false)` when no line is executing.
    pub fn next_segment<E, I>(&mut self, exec: &mut E, interpolator: &mut I) -> Result<bool, Fault>
    where
        E: SegmentExecutor,
        I: PowerInterpolator,
    {
        let Self {
            active,
            power,
            segment_time,
            ..
        } = self;

        let ActiveGenerator::Running(state) = active else {
            return Ok(false);
        };

        let phase_time = state.line.times[state.phase];
        let previous = state.t;
        let mut seg_time = *segment_time;
        state.t = previous + seg_time;

        // Clamp to the end of the phase
        if phase_time < state.t {
            seg_time = phase_time - previous;
            state.t = phase_time;
        }

        let k = state.anchor.at(state.t, state.jerk);
        let mut d = k.distance;
        if state.line.length < d {
            d = state.line.length;
        }

        interpolator.load_power_updates(power, state.last_distance, d);
        state.last_distance = d;

        if state.t == phase_time {
            match state.line.next_phase(Some(state.phase)) {
                Some(next) => {
                    state.enter_phase(next, exec);
                    state.t = 0.0;
                    state.anchor.distance = d;
                    state.anchor.velocity = k.velocity;
                }
                None => {
                    let line = state.line;
                    *active = ActiveGenerator::Idle;
                    interpolator.end_line(line.length);

                    let segment = Segment {
                        time: seg_time,
                        target: line.target,
                        velocity: line.target_vel,
                        accel: k.accel,
                        max_accel: line.max_accel,
                        max_jerk: line.max_jerk,
                    };
                    exec.segment(&segment, power)?;
                    return Ok(true);
                }
            }
        }

        let segment = Segment {
            time: seg_time,
            target: state.line.point_at(d),
            velocity: k.velocity,
            accel: k.accel,
            max_accel: state.line.max_accel,
            max_jerk: state.line.max_jerk,
        };
        exec.segment(&segment, power)?;
        Ok(true)
    }
}
