//! Move executor
//!
//! Runs in the trampoline context. Each call to [`Executor::exec_next`]
//! does one step of work: advance the running line by one segment, or
//! start the next queued command.

use kinesis_protocol::{Axes, Opcode};

use super::queue::{decode_payload, CommandSource, DwellPayload, PowerPayload};
use crate::config::MotionConfig;
use crate::error::Fault;
use crate::motion::{LineDescriptor, TrajectoryEngine};
use crate::stepper::StepperPort;
use crate::traits::{
    PowerInterpolator, PowerTable, Segment, SegmentExecutor, EMPTY_POWER_TABLE,
};

/// Outcome of one executor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExecStatus {
    /// A move was prepared for the scheduler
    Segment,
    /// Nothing to do
    Idle,
    /// A command ran without preparing a move; call again
    Again,
}

/// Last commanded motion state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecState {
    pub position: Axes,
    pub velocity: f32,
    pub accel: f32,
    pub jerk: f32,
}

/// Routes generated segments into the exec state and the scheduler
struct SegmentSink<'a, S> {
    state: &'a mut ExecState,
    port: &'a mut S,
}

impl<S: StepperPort> SegmentExecutor for SegmentSink<'_, S> {
    fn velocity(&self) -> f32 {
        self.state.velocity
    }

    fn set_jerk(&mut self, jerk: f32) {
        self.state.jerk = jerk;
    }

    fn segment(&mut self, segment: &Segment, power: &PowerTable) -> Result<(), Fault> {
        self.state.position = segment.target;
        self.state.velocity = segment.velocity;
        self.state.accel = segment.accel;

        self.port.prep_power(power)?;
        self.port.prep_line(&segment.target)
    }
}

/// Consumer of the command queue
pub struct Executor<I> {
    engine: TrajectoryEngine,
    state: ExecState,
    interpolator: I,
    min_velocity: f32,
}

impl<I: PowerInterpolator> Executor<I> {
    /// Create an idle executor
    pub fn new(interpolator: I, config: &MotionConfig) -> Self {
        Self {
            engine: TrajectoryEngine::new(config.segment_time()),
            state: ExecState::default(),
            interpolator,
            min_velocity: config.min_velocity,
        }
    }

    /// Do one step of work
    pub fn exec_next<Q, S>(&mut self, queue: &mut Q, port: &mut S) -> Result<ExecStatus, Fault>
    where
        Q: CommandSource,
        S: StepperPort,
    {
        if self.engine.is_running() {
            return self.advance(port);
        }

        let Some(command) = queue.pop_command() else {
            return Ok(ExecStatus::Idle);
        };

        match command.opcode {
            Opcode::Line => self.execute_line_descriptor(&command.payload, port),
            Opcode::Dwell => {
                let DwellPayload { seconds } = decode_payload(&command.payload)?;

                let mut table = EMPTY_POWER_TABLE;
                self.interpolator.load_power_updates(&mut table, 0.0, 0.0);
                port.prep_dwell(seconds, &table)?;
                Ok(ExecStatus::Segment)
            }
            Opcode::SyncPower => {
                let PowerPayload { offset, power } = decode_payload(&command.payload)?;
                self.interpolator.queue_power(offset, power);
                Ok(ExecStatus::Again)
            }
        }
    }

    /// Load an encoded line and emit its first segment
    pub fn execute_line_descriptor<S: StepperPort>(
        &mut self,
        bytes: &[u8],
        port: &mut S,
    ) -> Result<ExecStatus, Fault> {
        let line = LineDescriptor::decode(bytes)?;

        let mut sink = SegmentSink {
            state: &mut self.state,
            port: &mut *port,
        };
        self.engine.load(line, &mut sink);

        if !self.engine.is_running() {
            return Ok(ExecStatus::Again);
        }
        self.advance(port)
    }

    fn advance<S: StepperPort>(&mut self, port: &mut S) -> Result<ExecStatus, Fault> {
        let mut sink = SegmentSink {
            state: &mut self.state,
            port,
        };

        if self.engine.next_segment(&mut sink, &mut self.interpolator)? {
            Ok(ExecStatus::Segment)
        } else {
            Ok(ExecStatus::Again)
        }
    }

    /// Answer one move request from the scheduler
    ///
    /// Steps the executor until it prepares a move or runs out of work.
    /// When motion runs dry while the scheduler is idle, a nonzero velocity
    /// counts as an underrun and the velocity is forced to zero. The
    /// request is always finished, even on a fault.
    pub fn service_request<Q, S>(&mut self, queue: &mut Q, port: &mut S) -> Result<(), Fault>
    where
        Q: CommandSource,
        S: StepperPort,
    {
        let result = loop {
            match self.exec_next(queue, port) {
                Ok(ExecStatus::Again) => continue,
                Ok(ExecStatus::Idle) => {
                    if !port.is_busy() {
                        if self.min_velocity < self.state.velocity {
                            port.record_underrun();
                        }
                        self.state.velocity = 0.0;
                        port.power_idle();
                    }
                    break Ok(());
                }
                Ok(ExecStatus::Segment) => break port.mark_move_ready(),
                Err(fault) => break Err(fault),
            }
        };

        port.end_request();
        result
    }

    /// Drop the running line and forget the current velocity
    pub fn abort(&mut self) {
        self.engine.abort();
        self.state.velocity = 0.0;
        self.state.accel = 0.0;
        self.state.jerk = 0.0;
    }

    /// Last commanded motion state
    pub fn state(&self) -> &ExecState {
        &self.state
    }

    /// Last commanded position
    pub fn position(&self) -> Axes {
        self.state.position
    }

    /// Override the current position
    pub fn set_position(&mut self, position: &Axes) {
        self.state.position = *position;
    }

    /// Last commanded velocity
    pub fn velocity(&self) -> f32 {
        self.state.velocity
    }

    /// Segment generator
    pub fn engine(&self) -> &TrajectoryEngine {
        &self.engine
    }

    /// Power interpolator
    pub fn interpolator(&self) -> &I {
        &self.interpolator
    }
}
