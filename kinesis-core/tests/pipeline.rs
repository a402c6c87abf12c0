//! Host-side pipeline harness
//!
//! Drives the scheduler tick and the trampoline worker alternately, the way
//! the two interrupt priorities interleave on target.

use std::cell::Cell;

use kinesis_core::config::MotionConfig;
use kinesis_core::exec::{CommandProcessor, CommandQueue, Executor};
use kinesis_core::safety::EStop;
use kinesis_core::stepper::StepperScheduler;
use kinesis_core::traits::{
    MotorBank, PowerInterpolator, PowerOutput, PowerTable, PowerUpdate, Trampoline,
    POWER_MAX_UPDATES,
};
use kinesis_core::{CommandError, Fault};
use kinesis_protocol::{DwellCommand, LineCommand, AXES, PHASES};

#[derive(Default)]
struct Motors {
    prepared: [f32; AXES],
    loaded: Vec<[f32; AXES]>,
    ends: usize,
    /// Targets beyond this are refused
    limit: Option<f32>,
}

impl MotorBank for Motors {
    fn motor_count(&self) -> usize {
        AXES
    }

    fn axis(&self, motor: usize) -> usize {
        motor
    }

    fn prep_move(&mut self, motor: usize, target: f32) -> Result<(), Fault> {
        if self.limit.is_some_and(|limit| limit < target) {
            return Err(Fault::PositionOverflow);
        }
        self.prepared[motor] = target;
        Ok(())
    }

    fn load_move(&mut self, motor: usize) {
        if motor == 0 {
            self.loaded.push(self.prepared);
        }
    }

    fn end_move(&mut self, _motor: usize) {
        self.ends += 1;
    }
}

#[derive(Default)]
struct Spindle {
    applied: Vec<f32>,
    idles: usize,
}

impl PowerOutput for Spindle {
    fn apply(&mut self, update: PowerUpdate) {
        if update.set {
            self.applied.push(update.power);
        }
    }

    fn idle(&mut self) {
        self.idles += 1;
    }
}

#[derive(Default)]
struct Distances {
    intervals: Vec<(f32, f32)>,
}

impl PowerInterpolator for Distances {
    fn load_power_updates(&mut self, table: &mut PowerTable, from: f32, to: f32) {
        *table = [PowerUpdate::NONE; POWER_MAX_UPDATES];
        self.intervals.push((from, to));
    }

    fn queue_power(&mut self, _offset: f32, _power: f32) {}
}

#[derive(Default)]
struct Flag {
    pending: Cell<bool>,
    triggers: Cell<u32>,
}

impl Trampoline for Flag {
    fn trigger(&self) {
        self.pending.set(true);
        self.triggers.set(self.triggers.get() + 1);
    }
}

struct Machine {
    scheduler: StepperScheduler<Motors, Spindle>,
    executor: Executor<Distances>,
    processor: CommandProcessor,
    queue: CommandQueue<16>,
    trampoline: Flag,
    estop: EStop,
}

impl Machine {
    fn new() -> Self {
        let config = MotionConfig::default();
        Self {
            scheduler: StepperScheduler::new(Motors::default(), Spindle::default(), &config),
            executor: Executor::new(Distances::default(), &config),
            processor: CommandProcessor::new(),
            queue: CommandQueue::new(),
            trampoline: Flag::default(),
            estop: EStop::new(),
        }
    }

    fn submit(&mut self, command: &[u8]) -> Result<usize, CommandError> {
        self.processor.submit(command, &mut self.queue)
    }

    /// One tick, then the worker if the tick asked for it
    fn step(&mut self) {
        self.scheduler.tick(&self.trampoline);
        if self.trampoline.pending.replace(false) {
            let result = self
                .executor
                .service_request(&mut self.queue, &mut self.scheduler);
            if self.estop.check(result).is_none() {
                self.scheduler.shutdown();
            }
        }
    }

    fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        for tick in 0..max_ticks {
            self.step();
            if tick > 8
                && !self.scheduler.is_busy()
                && !self.scheduler.is_move_ready()
                && !self.scheduler.is_move_queued()
                && !self.scheduler.is_requesting()
                && self.queue.is_empty()
                && !self.executor.engine().is_running()
            {
                return tick;
            }
        }
        panic!("pipeline did not drain");
    }
}

fn line(target: [Option<f32>; AXES], target_vel: f32, times: [f32; PHASES]) -> Vec<u8> {
    LineCommand {
        target_vel,
        max_accel: 0.0,
        max_jerk: 0.0,
        target,
        times,
    }
    .encode()
    .unwrap()
    .to_vec()
}

fn cruise(seconds: f32) -> [f32; PHASES] {
    [0.0, 0.0, 0.0, seconds, 0.0, 0.0, 0.0]
}

#[test]
fn pure_cruise_line() {
    let mut machine = Machine::new();

    // Lead-in that ends at 5.0 so the cruise starts moving
    machine.processor.set_position(&[-0.02, 0.0, 0.0, 0.0]);
    machine
        .submit(&line([Some(0.0), None, None, None], 5.0, cruise(0.004)))
        .unwrap();
    machine
        .submit(&line([Some(0.5), None, None, None], 5.0, cruise(0.1)))
        .unwrap();
    assert_eq!(machine.processor.position(), [0.5, 0.0, 0.0, 0.0]);

    machine.run_until_idle(1000);

    let loaded = &machine.scheduler.motors().loaded;
    assert_eq!(*loaded.last().unwrap(), [0.5, 0.0, 0.0, 0.0]);

    // Cruise intervals after the single lead-in segment
    let intervals = &machine.executor.interpolator().intervals[1..];
    assert!(intervals.len() >= 25);
    let mut traveled = 0.0;
    for &(from, to) in &intervals[..intervals.len() - 1] {
        assert!(((to - from) - 0.02).abs() < 1e-5);
        traveled += to - from;
    }
    let &(from, to) = intervals.last().unwrap();
    traveled += to - from;
    assert!((traveled - 0.5).abs() < 1e-5);

    // Ran dry at speed after the last move
    assert_eq!(machine.scheduler.underrun(), 1);
    assert_eq!(machine.executor.velocity(), 0.0);
    assert!(machine.scheduler.power_output().idles >= 1);
    assert!(!machine.estop.is_triggered());
}

#[test]
fn every_segment_is_loaded_in_order() {
    let mut machine = Machine::new();

    machine
        .submit(&line([Some(1.0), Some(1.0), None, None], 0.0, cruise(0.02)))
        .unwrap();
    machine
        .submit(&line([Some(2.0), None, Some(3.0), None], 0.0, cruise(0.02)))
        .unwrap();

    machine.run_until_idle(1000);

    let loaded = &machine.scheduler.motors().loaded;
    // About 5 segments of 4 ms per line
    assert!((10..=12).contains(&loaded.len()));

    // Both lines start from rest, so intermediate targets hold the start
    let first_end = loaded
        .iter()
        .position(|p| *p == [1.0, 1.0, 0.0, 0.0])
        .unwrap();
    assert!(loaded[..first_end].iter().all(|p| *p == [0.0; AXES]));
    assert!(loaded[first_end..loaded.len() - 1]
        .iter()
        .all(|p| *p == [1.0, 1.0, 0.0, 0.0]));
    assert_eq!(*loaded.last().unwrap(), [2.0, 1.0, 3.0, 0.0]);
    assert_eq!(machine.scheduler.underrun(), 0);
}

#[test]
fn dwell_between_moves() {
    let mut machine = Machine::new();

    machine
        .submit(&DwellCommand { seconds: 0.01 }.encode().unwrap())
        .unwrap();
    machine
        .submit(&line([Some(1.0), None, None, None], 0.0, cruise(0.004)))
        .unwrap();

    // Dwell is prepared on the first request and starts on the next boundary
    machine.step();
    machine.step();
    assert!(machine.scheduler.dwell_remaining() > 0.0);
    assert!(machine.scheduler.motors().loaded.is_empty());

    let ticks = machine.run_until_idle(1000);
    assert!(ticks >= 10);
    assert_eq!(machine.scheduler.motors().loaded.len(), 1);
}

#[test]
fn backpressure_rejects_second_prepare() {
    let mut machine = Machine::new();

    machine.scheduler.prep_line(&[1.0; AXES]).unwrap();
    assert_eq!(
        machine.scheduler.prep_line(&[2.0; AXES]),
        Err(Fault::StepperNotReady)
    );

    machine.scheduler.mark_move_ready().unwrap();
    assert_eq!(
        machine.scheduler.prep_line(&[2.0; AXES]),
        Err(Fault::StepperNotReady)
    );

    // Consuming the move reopens the slot
    machine.scheduler.tick(&machine.trampoline);
    assert!(machine.scheduler.prep_line(&[2.0; AXES]).is_ok());
}

#[test]
fn outstanding_request_is_not_redispatched() {
    let mut machine = Machine::new();

    machine.scheduler.tick(&machine.trampoline);
    assert_eq!(machine.trampoline.triggers.get(), 1);

    let busy = machine.scheduler.is_busy();
    let ready = machine.scheduler.is_move_ready();
    for _ in 0..16 {
        machine.scheduler.tick(&machine.trampoline);
    }

    assert_eq!(machine.trampoline.triggers.get(), 1);
    assert!(machine.scheduler.is_requesting());
    assert_eq!(machine.scheduler.is_busy(), busy);
    assert_eq!(machine.scheduler.is_move_ready(), ready);
    assert_eq!(machine.scheduler.motors().ends, 17 * AXES);
}

#[test]
fn fault_latches_estop_and_halts() {
    let mut machine = Machine::new();

    // Exec layer prepares a move, then the slot is forced busy
    machine
        .submit(&line([Some(1.0), None, None, None], 0.0, cruise(0.1)))
        .unwrap();
    machine.scheduler.prep_line(&[0.0; AXES]).unwrap();

    machine.step();
    assert_eq!(machine.estop.fault(), Some(Fault::StepperNotReady));
    assert!(machine.scheduler.is_halted());
    assert!(!machine.scheduler.is_requesting());
    assert_eq!(machine.scheduler.power_output().applied.last(), Some(&0.0));

    let triggers = machine.trampoline.triggers.get();
    for _ in 0..8 {
        machine.step();
    }
    assert_eq!(machine.trampoline.triggers.get(), triggers);
}

#[test]
fn unreachable_target_latches_estop() {
    let mut machine = Machine::new();
    machine.scheduler = StepperScheduler::new(
        Motors {
            limit: Some(10.0),
            ..Motors::default()
        },
        Spindle::default(),
        &MotionConfig::default(),
    );

    machine
        .submit(&line([Some(5.0), None, None, None], 0.0, cruise(0.004)))
        .unwrap();
    machine
        .submit(&line([Some(50.0), None, None, None], 0.0, cruise(0.004)))
        .unwrap();

    for _ in 0..32 {
        machine.step();
    }

    assert_eq!(machine.estop.fault(), Some(Fault::PositionOverflow));
    assert!(machine.scheduler.is_halted());
    assert_eq!(
        machine.scheduler.motors().loaded.last(),
        Some(&[5.0, 0.0, 0.0, 0.0])
    );
}

#[test]
fn rejected_commands_leave_pipeline_untouched() {
    let mut machine = Machine::new();

    assert_eq!(
        machine.submit(&line([Some(1.0), None, None, None], 0.0, [0.0; PHASES])),
        Err(CommandError::AllZeroScurveTimes)
    );
    assert_eq!(machine.submit(b"q"), Err(CommandError::UnknownCommand));
    assert!(machine.queue.is_empty());
    assert_eq!(machine.processor.position(), [0.0; AXES]);
}
