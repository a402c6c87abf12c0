//! PIO-based stepper motor driver
//!
//! Uses RP2040's Programmable I/O to generate step pulses. All state
//! machines share one loaded program; each motor owns a state machine.
//! Direction and enable are handled via GPIO.

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, LoadedProgram, Pin as PioOutput, PioPin,
    ShiftConfig, ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;

use kinesis_core::traits::StepOutput;

use crate::pio::PulseTrain;

/// Counted pulse-train program, loaded once per PIO block
pub struct StepProgram<'d, PIO: Instance> {
    prg: LoadedProgram<'d, PIO>,
}

impl<'d, PIO: Instance> StepProgram<'d, PIO> {
    /// Load the program into the PIO block's instruction memory
    pub fn new(common: &mut Common<'d, PIO>) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "    pull block",
            "    mov x, osr",
            "    pull block",
            "step:",
            "    set pins, 1",
            "    mov y, osr",
            "high:",
            "    jmp y-- high",
            "    set pins, 0",
            "    mov y, osr",
            "low:",
            "    jmp y-- low",
            "    jmp x-- step",
            ".wrap"
        );

        let prg = common.load_program(&prg.program);
        Self { prg }
    }
}

/// PIO stepper driver
pub struct PioStepper<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    /// State machine config, reapplied to rewind the program
    cfg: Config<'d, PIO>,
    step_pin: PioOutput<'d, PIO>,
    dir_pin: Output<'d>,
    enable_pin: Output<'d>,
    enable_inverted: bool,
}

impl<'d, PIO: Instance, const SM: usize> PioStepper<'d, PIO, SM> {
    /// Create a new PIO stepper driver
    ///
    /// # Arguments
    /// * `common` - PIO common resources
    /// * `program` - Step program loaded into the same PIO block
    /// * `sm` - State machine to use
    /// * `step_pin` - GPIO pin for step pulses (must be PIO-capable)
    /// * `dir_pin` - GPIO pin for direction control
    /// * `enable_pin` - GPIO pin for enable control
    /// * `enable_inverted` - Enable pin is active low
    pub fn new<STEP: PioPin, DIR: Pin, EN: Pin>(
        common: &mut Common<'d, PIO>,
        program: &StepProgram<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        step_pin: Peri<'d, STEP>,
        dir_pin: Peri<'d, DIR>,
        enable_pin: Peri<'d, EN>,
        enable_inverted: bool,
    ) -> Self {
        let step_pin = common.make_pio_pin(step_pin);

        let mut cfg = Config::default();
        cfg.use_program(&program.prg, &[]);
        cfg.set_set_pins(&[&step_pin]);
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        };

        // Run at the system clock; the delay word sets the step rate
        cfg.clock_divider = U24F8::from_bits(1 << 8);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &[&step_pin]);
        sm.set_pins(Level::Low, &[&step_pin]);

        let dir_pin = Output::new(dir_pin, Level::Low);

        // Start disabled
        let enable_level = if enable_inverted {
            Level::High
        } else {
            Level::Low
        };
        let enable_pin = Output::new(enable_pin, enable_level);

        Self {
            sm,
            cfg,
            step_pin,
            dir_pin,
            enable_pin,
            enable_inverted,
        }
    }

    /// Halt the state machine and rewind it to the first pull
    fn rewind(&mut self) {
        self.sm.set_enable(false);
        self.sm.clear_fifos();
        self.sm.set_config(&self.cfg);
        self.sm.set_pins(Level::Low, &[&self.step_pin]);
    }
}

impl<PIO: Instance, const SM: usize> StepOutput for PioStepper<'_, PIO, SM> {
    fn start(&mut self, steps: u32, forward: bool, duration_us: u32) {
        let Some(train) = PulseTrain::new(steps, duration_us) else {
            self.stop();
            return;
        };

        self.rewind();

        if forward {
            self.dir_pin.set_low();
        } else {
            self.dir_pin.set_high();
        }

        // The FIFO was just cleared and holds four words
        let _ = self.sm.tx().try_push(train.count);
        let _ = self.sm.tx().try_push(train.delay);

        self.sm.set_enable(true);
    }

    fn stop(&mut self) {
        self.rewind();
    }

    fn enable(&mut self, enabled: bool) {
        if enabled != self.enable_inverted {
            self.enable_pin.set_high();
        } else {
            self.enable_pin.set_low();
        }
    }

    fn max_steps(&self, duration_us: u32) -> u32 {
        PulseTrain::max_steps(duration_us)
    }
}

/// A PIO stepper on any of the four state machines
///
/// Lets motors on different state machines share one motor array type.
pub enum StepChannel<'d, PIO: Instance> {
    Sm0(PioStepper<'d, PIO, 0>),
    Sm1(PioStepper<'d, PIO, 1>),
    Sm2(PioStepper<'d, PIO, 2>),
    Sm3(PioStepper<'d, PIO, 3>),
}

macro_rules! each_channel {
    ($channel:expr, $stepper:ident => $body:expr) => {
        match $channel {
            StepChannel::Sm0($stepper) => $body,
            StepChannel::Sm1($stepper) => $body,
            StepChannel::Sm2($stepper) => $body,
            StepChannel::Sm3($stepper) => $body,
        }
    };
}

impl<PIO: Instance> StepOutput for StepChannel<'_, PIO> {
    fn start(&mut self, steps: u32, forward: bool, duration_us: u32) {
        each_channel!(self, s => s.start(steps, forward, duration_us))
    }

    fn stop(&mut self) {
        each_channel!(self, s => s.stop())
    }

    fn enable(&mut self, enabled: bool) {
        each_channel!(self, s => s.enable(enabled))
    }

    fn max_steps(&self, duration_us: u32) -> u32 {
        each_channel!(self, s => s.max_steps(duration_us))
    }
}

impl<'d, PIO: Instance> From<PioStepper<'d, PIO, 0>> for StepChannel<'d, PIO> {
    fn from(stepper: PioStepper<'d, PIO, 0>) -> Self {
        Self::Sm0(stepper)
    }
}

impl<'d, PIO: Instance> From<PioStepper<'d, PIO, 1>> for StepChannel<'d, PIO> {
    fn from(stepper: PioStepper<'d, PIO, 1>) -> Self {
        Self::Sm1(stepper)
    }
}

impl<'d, PIO: Instance> From<PioStepper<'d, PIO, 2>> for StepChannel<'d, PIO> {
    fn from(stepper: PioStepper<'d, PIO, 2>) -> Self {
        Self::Sm2(stepper)
    }
}

impl<'d, PIO: Instance> From<PioStepper<'d, PIO, 3>> for StepChannel<'d, PIO> {
    fn from(stepper: PioStepper<'d, PIO, 3>) -> Self {
        Self::Sm3(stepper)
    }
}
