//! Shared state between the tick, trampoline and command contexts
//!
//! Each context runs on its own executor at its own priority. The
//! scheduler and the command queue sit behind critical-section mutexes;
//! every access locks for a single call so the tick can preempt the
//! trampoline between calls.

use core::cell::RefCell;

use embassy_rp::peripherals::PIO0;
use embassy_rp::pwm::PwmOutput;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use kinesis_core::config::MAX_MOTORS;
use kinesis_core::exec::{CommandQueue, CommandSink, CommandSource, QueuedCommand};
use kinesis_core::safety::EStop;
use kinesis_core::stepper::{StepperPort, StepperScheduler};
use kinesis_core::traits::{PowerTable, Trampoline};
use kinesis_core::{CommandError, Fault};
use kinesis_drivers::motor::StepMotors;
use kinesis_drivers::spindle::PwmSpindle;
use kinesis_hal_rp2040::StepChannel;
use kinesis_protocol::{Axes, Opcode};

/// Commands buffered ahead of the executor
pub const QUEUE_DEPTH: usize = 16;

/// Motors on the board, one per PIO0 state machine
pub type Motors = StepMotors<StepChannel<'static, PIO0>, MAX_MOTORS>;

/// Spindle on a PWM channel
pub type Spindle = PwmSpindle<PwmOutput<'static>>;

/// The stepper scheduler as wired on this board
pub type Scheduler = StepperScheduler<Motors, Spindle>;

/// Scheduler shared between the tick and the trampoline
pub type SharedScheduler = Mutex<CriticalSectionRawMutex, RefCell<Scheduler>>;

/// Queued commands, filled by the command task and drained by the trampoline
pub static COMMAND_QUEUE: Mutex<CriticalSectionRawMutex, RefCell<CommandQueue<QUEUE_DEPTH>>> =
    Mutex::new(RefCell::new(CommandQueue::new()));

/// Latched emergency stop
pub static ESTOP: Mutex<CriticalSectionRawMutex, RefCell<EStop>> =
    Mutex::new(RefCell::new(EStop::new()));

/// Raised by the tick when the scheduler wants its next move
pub static MOVE_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Trampoline that wakes the trampoline task
pub struct MoveRequest;

impl Trampoline for MoveRequest {
    fn trigger(&self) {
        MOVE_REQUEST.signal(());
    }
}

/// Check if the emergency stop has latched
pub fn estop_triggered() -> bool {
    ESTOP.lock(|estop| estop.borrow().is_triggered())
}

/// Stepper port that locks the shared scheduler for each call
pub struct SchedulerPort(pub &'static SharedScheduler);

impl SchedulerPort {
    fn with<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        self.0.lock(|scheduler| f(&mut scheduler.borrow_mut()))
    }
}

impl StepperPort for SchedulerPort {
    fn prep_line(&mut self, target: &Axes) -> Result<(), Fault> {
        self.with(|s| s.prep_line(target))
    }

    fn prep_power(&mut self, table: &PowerTable) -> Result<(), Fault> {
        self.with(|s| s.prep_power(table))
    }

    fn prep_dwell(&mut self, seconds: f32, table: &PowerTable) -> Result<(), Fault> {
        self.with(|s| s.prep_dwell(seconds, table))
    }

    fn is_busy(&self) -> bool {
        self.with(|s| s.is_busy())
    }

    fn mark_move_ready(&mut self) -> Result<(), Fault> {
        self.with(|s| s.mark_move_ready())
    }

    fn record_underrun(&mut self) {
        self.with(|s| s.record_underrun())
    }

    fn power_idle(&mut self) {
        self.with(|s| s.power_idle())
    }

    fn end_request(&mut self) {
        self.with(|s| s.end_request())
    }
}

/// Handle on the shared command queue, locking for each push or pop
pub struct SharedQueue;

impl SharedQueue {
    /// Drop every queued command
    pub fn clear(&mut self) {
        COMMAND_QUEUE.lock(|queue| queue.borrow_mut().clear());
    }
}

impl CommandSource for SharedQueue {
    fn pop_command(&mut self) -> Option<QueuedCommand> {
        COMMAND_QUEUE.lock(|queue| queue.borrow_mut().pop_command())
    }
}

impl CommandSink for SharedQueue {
    fn push_command(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), CommandError> {
        COMMAND_QUEUE.lock(|queue| queue.borrow_mut().push_command(opcode, payload))
    }
}
