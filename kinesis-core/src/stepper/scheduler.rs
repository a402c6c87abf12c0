//! Stepper scheduler
//!
//! Runs once per tick from the highest-priority context. Every
//! [`POWER_MAX_UPDATES`] ticks it starts the next prepared move (or dwell)
//! and requests another one from the trampoline. One move executes while
//! the next is prepared, so the pipeline is never more than two deep.
//!
//! ```text
//!  trampoline                           tick
//!  ──────────                           ────
//!  prep_power/prep_line ─▶ queued
//!  mark_move_ready      ─▶ ready ──────▶ load motors, request next
//! ```

use core::fmt;

use kinesis_protocol::Axes;

use super::port::StepperPort;
use crate::config::MotionConfig;
use crate::error::Fault;
use crate::traits::{
    MotorBank, PowerOutput, PowerTable, PowerUpdate, Trampoline, EMPTY_POWER_TABLE,
    POWER_MAX_UPDATES,
};

/// Observable scheduler state, read in one lock
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerStatus {
    pub busy: bool,
    pub underrun: u32,
    /// Remaining dwell in seconds
    pub dwell: f32,
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "busy={} underrun={} dwell={}",
            self.busy as u8, self.underrun, self.dwell
        )
    }
}

/// Real-time move scheduler
pub struct StepperScheduler<M, P> {
    motors: M,
    power_out: P,
    tick_period: f32,
    min_dwell: f32,

    // Runtime
    busy: bool,
    requesting: bool,
    dwell: f32,
    power_buf: usize,
    power_index: usize,
    tick: u32,
    halted: bool,

    // Move prep
    move_ready: bool,
    move_queued: bool,
    prep_dwell: f32,
    power_next: Option<usize>,
    powers: [PowerTable; 2],

    underrun: u32,
}

impl<M: MotorBank, P: PowerOutput> StepperScheduler<M, P> {
    /// Create an idle scheduler
    pub fn new(motors: M, power_out: P, config: &MotionConfig) -> Self {
        Self {
            motors,
            power_out,
            tick_period: config.tick_period,
            min_dwell: config.min_dwell,
            busy: false,
            requesting: false,
            dwell: 0.0,
            power_buf: 0,
            // Start exhausted so nothing is applied before the first table
            power_index: POWER_MAX_UPDATES,
            tick: 0,
            halted: false,
            move_ready: false,
            move_queued: false,
            prep_dwell: 0.0,
            power_next: None,
            powers: [EMPTY_POWER_TABLE; 2],
            underrun: 0,
        }
    }

    /// Run one scheduler tick
    ///
    /// Never blocks. Requests the next move through `trampoline` whenever
    /// the prepared slot is empty.
    pub fn tick<T: Trampoline>(&mut self, trampoline: &T) {
        if self.halted {
            return;
        }

        self.update_power();

        if 0.0 < self.dwell {
            self.dwell -= self.tick_period;
            return;
        }
        self.dwell = 0.0;

        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        if tick % POWER_MAX_UPDATES as u32 != 0 {
            return;
        }

        if !self.move_ready {
            self.request_move(trampoline);
            self.motors.end_all();
            // Retry on the next tick
            self.tick = 0;
            self.busy = false;
            return;
        }

        if self.prep_dwell != 0.0 {
            self.motors.end_all();
            self.dwell = self.prep_dwell;
            self.prep_dwell = 0.0;
        } else {
            self.motors.load_all();
            // Not during a dwell: preparing a move may enable motors
            self.request_move(trampoline);
        }

        if let Some(next) = self.power_next.take() {
            self.power_index = 0;
            self.power_buf = next;
            self.update_power();
        }

        self.busy = true;
        self.move_ready = false;
    }

    fn request_move<T: Trampoline>(&mut self, trampoline: &T) {
        if self.requesting {
            return;
        }
        self.requesting = true;
        trampoline.trigger();
    }

    fn update_power(&mut self) {
        if self.power_index < POWER_MAX_UPDATES {
            let update = self.powers[self.power_buf][self.power_index];
            self.power_index += 1;
            self.power_out.apply(update);
        }
    }

    fn check_ready(&self) -> Result<(), Fault> {
        if self.move_ready || self.move_queued {
            return Err(Fault::StepperNotReady);
        }
        Ok(())
    }

    /// Prepare a move of every motor to its axis of `target`
    pub fn prep_line(&mut self, target: &Axes) -> Result<(), Fault> {
        self.check_ready()?;

        for motor in 0..self.motors.motor_count() {
            let axis = self.motors.axis(motor);
            self.motors.prep_move(motor, target[axis])?;
        }

        self.move_queued = true;
        Ok(())
    }

    /// Stage a power table into the inactive buffer half
    pub fn prep_power(&mut self, table: &PowerTable) -> Result<(), Fault> {
        self.check_ready()?;

        let next = 1 - self.power_buf;
        self.powers[next] = *table;
        self.power_next = Some(next);
        Ok(())
    }

    /// Prepare a dwell of at least the configured minimum length
    pub fn prep_dwell(&mut self, seconds: f32, table: &PowerTable) -> Result<(), Fault> {
        self.check_ready()?;

        let next = 1 - self.power_buf;
        self.powers[next] = *table;
        self.power_next = Some(next);
        self.prep_dwell = if seconds <= self.min_dwell {
            self.min_dwell
        } else {
            seconds
        };
        self.move_queued = true;
        Ok(())
    }

    /// Promote the queued move to ready
    pub fn mark_move_ready(&mut self) -> Result<(), Fault> {
        if !self.move_queued {
            return Err(Fault::ExpectedMove);
        }
        self.move_queued = false;
        self.move_ready = true;
        Ok(())
    }

    /// Clear the outstanding request flag
    pub fn end_request(&mut self) {
        self.requesting = false;
    }

    /// Count one underrun
    pub fn record_underrun(&mut self) {
        self.underrun = self.underrun.wrapping_add(1);
    }

    /// Idle the power output
    pub fn power_idle(&mut self) {
        self.power_out.idle();
    }

    /// Stop the scheduler for good
    ///
    /// Ends all motor moves and turns the power output off. Subsequent
    /// ticks do nothing and no further moves are requested.
    pub fn shutdown(&mut self) {
        self.halted = true;
        self.motors.end_all();
        self.power_out.apply(PowerUpdate::set(0.0));
        self.busy = false;
    }

    /// Check if motors or a dwell are running
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Check if `shutdown` has been called
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Check if a move request is outstanding
    pub fn is_requesting(&self) -> bool {
        self.requesting
    }

    /// Check if a move is ready for the next boundary
    pub fn is_move_ready(&self) -> bool {
        self.move_ready
    }

    /// Check if a move has been prepared but not yet promoted
    pub fn is_move_queued(&self) -> bool {
        self.move_queued
    }

    /// Number of times motion ran dry while moving
    pub fn underrun(&self) -> u32 {
        self.underrun
    }

    /// Remaining time of the active dwell in seconds
    pub fn dwell_remaining(&self) -> f32 {
        self.dwell
    }

    /// Busy flag, underrun count and dwell remaining together
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            busy: self.busy,
            underrun: self.underrun,
            dwell: if 0.0 < self.dwell { self.dwell } else { 0.0 },
        }
    }

    /// Motor bank
    pub fn motors(&self) -> &M {
        &self.motors
    }

    /// Power output
    pub fn power_output(&self) -> &P {
        &self.power_out
    }
}

impl<M: MotorBank, P: PowerOutput> StepperPort for StepperScheduler<M, P> {
    fn prep_line(&mut self, target: &Axes) -> Result<(), Fault> {
        StepperScheduler::prep_line(self, target)
    }

    fn prep_power(&mut self, table: &PowerTable) -> Result<(), Fault> {
        StepperScheduler::prep_power(self, table)
    }

    fn prep_dwell(&mut self, seconds: f32, table: &PowerTable) -> Result<(), Fault> {
        StepperScheduler::prep_dwell(self, seconds, table)
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn mark_move_ready(&mut self) -> Result<(), Fault> {
        StepperScheduler::mark_move_ready(self)
    }

    fn record_underrun(&mut self) {
        StepperScheduler::record_underrun(self)
    }

    fn power_idle(&mut self) {
        StepperScheduler::power_idle(self)
    }

    fn end_request(&mut self) {
        StepperScheduler::end_request(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use kinesis_protocol::AXES;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum MotorCall {
        Prep(usize, f32),
        Load(usize),
        End(usize),
    }

    #[derive(Default)]
    struct Motors {
        calls: heapless::Vec<MotorCall, 64>,
    }

    impl MotorBank for Motors {
        fn motor_count(&self) -> usize {
            2
        }

        fn axis(&self, motor: usize) -> usize {
            // Motor 1 follows the z axis
            if motor == 0 {
                0
            } else {
                2
            }
        }

        fn prep_move(&mut self, motor: usize, target: f32) -> Result<(), Fault> {
            if !(-1000.0..=1000.0).contains(&target) {
                return Err(Fault::PositionOverflow);
            }
            let _ = self.calls.push(MotorCall::Prep(motor, target));
            Ok(())
        }

        fn load_move(&mut self, motor: usize) {
            let _ = self.calls.push(MotorCall::Load(motor));
        }

        fn end_move(&mut self, motor: usize) {
            let _ = self.calls.push(MotorCall::End(motor));
        }
    }

    #[derive(Default)]
    struct Power {
        applied: heapless::Vec<PowerUpdate, 32>,
        idles: u32,
    }

    impl PowerOutput for Power {
        fn apply(&mut self, update: PowerUpdate) {
            let _ = self.applied.push(update);
        }

        fn idle(&mut self) {
            self.idles += 1;
        }
    }

    #[derive(Default)]
    struct Counter(Cell<u32>);

    impl Trampoline for Counter {
        fn trigger(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn scheduler() -> StepperScheduler<Motors, Power> {
        StepperScheduler::new(Motors::default(), Power::default(), &MotionConfig::default())
    }

    #[test]
    fn test_idle_tick_requests_once() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        st.tick(&trampoline);
        assert_eq!(trampoline.0.get(), 1);
        assert!(st.is_requesting());
        assert!(!st.is_busy());

        // Request still outstanding: no additional dispatch
        for _ in 0..8 {
            st.tick(&trampoline);
        }
        assert_eq!(trampoline.0.get(), 1);

        st.end_request();
        st.tick(&trampoline);
        assert_eq!(trampoline.0.get(), 2);
    }

    #[test]
    fn test_prep_line_uses_axis_map() {
        let mut st = scheduler();
        st.prep_line(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(
            st.motors().calls.as_slice(),
            &[MotorCall::Prep(0, 1.0), MotorCall::Prep(1, 3.0)]
        );
        assert!(st.is_move_queued());
        assert!(!st.is_move_ready());
    }

    #[test]
    fn test_second_prep_is_rejected() {
        let mut st = scheduler();
        st.prep_line(&[1.0; AXES]).unwrap();

        assert_eq!(st.prep_line(&[2.0; AXES]), Err(Fault::StepperNotReady));
        assert_eq!(st.prep_power(&EMPTY_POWER_TABLE), Err(Fault::StepperNotReady));
        assert_eq!(
            st.prep_dwell(1.0, &EMPTY_POWER_TABLE),
            Err(Fault::StepperNotReady)
        );
        // Prepared move not overwritten
        assert_eq!(st.motors().calls.len(), 2);

        st.mark_move_ready().unwrap();
        assert_eq!(st.prep_line(&[2.0; AXES]), Err(Fault::StepperNotReady));
    }

    #[test]
    fn test_motor_fault_leaves_slot_empty() {
        let mut st = scheduler();

        assert_eq!(
            st.prep_line(&[0.0, 0.0, 5000.0, 0.0]),
            Err(Fault::PositionOverflow)
        );
        assert!(!st.is_move_queued());
        assert_eq!(st.mark_move_ready(), Err(Fault::ExpectedMove));
    }

    #[test]
    fn test_mark_ready_without_move() {
        let mut st = scheduler();
        assert_eq!(st.mark_move_ready(), Err(Fault::ExpectedMove));
    }

    #[test]
    fn test_ready_move_loads_on_boundary() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        st.prep_line(&[1.0; AXES]).unwrap();
        st.mark_move_ready().unwrap();
        st.tick(&trampoline);

        assert!(st.is_busy());
        assert!(!st.is_move_ready());
        assert_eq!(trampoline.0.get(), 1);
        assert_eq!(
            &st.motors().calls[2..],
            &[MotorCall::Load(0), MotorCall::Load(1)]
        );

        // Next three ticks are inside the segment
        st.end_request();
        for _ in 0..3 {
            st.tick(&trampoline);
        }
        assert_eq!(trampoline.0.get(), 1);
        assert_eq!(st.motors().calls.len(), 4);

        // Boundary with nothing ready ends the move
        st.tick(&trampoline);
        assert!(!st.is_busy());
        assert_eq!(trampoline.0.get(), 2);
        assert_eq!(
            &st.motors().calls[4..],
            &[MotorCall::End(0), MotorCall::End(1)]
        );
    }

    #[test]
    fn test_power_table_applied_one_entry_per_tick() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        let table = [
            PowerUpdate::set(0.1),
            PowerUpdate::NONE,
            PowerUpdate::set(0.3),
            PowerUpdate::set(0.4),
        ];
        st.prep_power(&table).unwrap();
        st.prep_line(&[0.0; AXES]).unwrap();
        st.mark_move_ready().unwrap();

        for _ in 0..4 {
            st.tick(&trampoline);
        }
        assert_eq!(st.power_output().applied.as_slice(), &table);

        // Table exhausted
        st.tick(&trampoline);
        assert_eq!(st.power_output().applied.len(), 4);
    }

    #[test]
    fn test_dwell_counts_down() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        st.prep_dwell(0.005, &EMPTY_POWER_TABLE).unwrap();
        st.mark_move_ready().unwrap();
        st.tick(&trampoline);

        assert!(st.is_busy());
        assert_eq!(st.dwell_remaining(), 0.005);
        // No request during a dwell
        assert_eq!(trampoline.0.get(), 0);
        assert_eq!(
            st.motors().calls.as_slice(),
            &[MotorCall::End(0), MotorCall::End(1)]
        );

        let mut ticks = 0;
        while st.dwell_remaining() > 0.0 {
            st.tick(&trampoline);
            ticks += 1;
        }
        assert!((5..=6).contains(&ticks));
        assert_eq!(trampoline.0.get(), 0);

        // Dwell over: boundary reached on a later tick requests again
        for _ in 0..4 {
            st.tick(&trampoline);
        }
        assert_eq!(trampoline.0.get(), 1);
    }

    #[test]
    fn test_dwell_floor() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        st.prep_dwell(0.0, &EMPTY_POWER_TABLE).unwrap();
        st.mark_move_ready().unwrap();
        st.tick(&trampoline);
        assert_eq!(st.dwell_remaining(), MotionConfig::default().min_dwell);
    }

    #[test]
    fn test_shutdown_stops_everything() {
        let mut st = scheduler();
        let trampoline = Counter::default();

        st.prep_line(&[1.0; AXES]).unwrap();
        st.mark_move_ready().unwrap();
        st.shutdown();

        assert!(st.is_halted());
        assert_eq!(
            st.power_output().applied.as_slice(),
            &[PowerUpdate::set(0.0)]
        );

        for _ in 0..8 {
            st.tick(&trampoline);
        }
        assert_eq!(trampoline.0.get(), 0);
        assert!(!st.is_busy());
    }

    #[test]
    fn test_underrun_counter() {
        let mut st = scheduler();
        st.record_underrun();
        st.record_underrun();
        assert_eq!(st.underrun(), 2);

        st.power_idle();
        assert_eq!(st.power_output().idles, 1);
    }

    #[test]
    fn test_status_report() {
        use core::fmt::Write;

        let mut st = scheduler();
        let trampoline = Counter::default();
        st.record_underrun();
        st.prep_dwell(0.5, &EMPTY_POWER_TABLE).unwrap();
        st.mark_move_ready().unwrap();
        st.tick(&trampoline);

        let status = st.status();
        assert_eq!(
            status,
            SchedulerStatus {
                busy: true,
                underrun: 1,
                dwell: 0.5,
            }
        );

        let mut line: heapless::String<48> = heapless::String::new();
        write!(line, "{}", status).unwrap();
        assert_eq!(line.as_str(), "busy=1 underrun=1 dwell=0.5");

        st.shutdown();
        assert!(!st.status().busy);
    }
}
