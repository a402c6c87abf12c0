//! Kinesis - CNC Motion Controller Firmware
//!
//! Main firmware binary for RP2040-based stepper controller boards.
//! Three contexts share the motion pipeline:
//!
//! - tick: fixed-period scheduler tick on `SWI_IRQ_1` at priority P1
//! - trampoline: move request servicing on `SWI_IRQ_0` at priority P2
//! - thread mode: host command link and status queries
//!
//! Named after the Greek "kinesis" meaning "motion".

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::{PIO0, UART0};
use embassy_rp::pio::Pio;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_sync::blocking_mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use kinesis_core::config::{MotionConfig, MAX_MOTORS};
use kinesis_core::exec::Executor;
use kinesis_core::stepper::StepperScheduler;
use kinesis_drivers::motor::{StepMotor, StepMotors};
use kinesis_drivers::spindle::{PwmSpindle, SyncPower};
use kinesis_hal_rp2040::{PioStepper, StepChannel, StepProgram};

use crate::channels::{Motors, SharedScheduler};
use crate::config::parse_config;

mod channels;
mod config;
mod tasks;

/// Embedded machine description (compiled into firmware)
/// Edit machine.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../machine.toml");

/// PWM counter top for the spindle output (~125 kHz at 125 MHz)
const SPINDLE_PWM_TOP: u16 = 999;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

static EXECUTOR_TICK: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_TRAMPOLINE: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_TICK.on_interrupt()
}

#[interrupt]
unsafe fn SWI_IRQ_0() {
    EXECUTOR_TRAMPOLINE.on_interrupt()
}

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

static SCHEDULER: StaticCell<SharedScheduler> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Kinesis firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("machine.toml rejected: {:?}", e);
            warn!("Falling back to default configuration");
            MotionConfig::default()
        }
    };
    if config.motors.len() != MAX_MOTORS {
        defmt::panic!(
            "Board has {} motor slots, config defines {}",
            MAX_MOTORS,
            config.motors.len()
        );
    }
    info!(
        "Configuration loaded: tick {} us, segment {} us",
        config.tick_period_us(),
        config.segment_time_us()
    );

    // Host command link
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for host commands");

    // Step generators on PIO0, one state machine per driver slot
    // Pin assignments are board-specific (SKR Pico X/Y/Z/E drivers)
    let Pio {
        mut common,
        sm0,
        sm1,
        sm2,
        sm3,
        ..
    } = Pio::new(p.PIO0, Irqs);

    let program = StepProgram::new(&mut common);

    let x = PioStepper::new(&mut common, &program, sm0, p.PIN_11, p.PIN_10, p.PIN_12, true);
    let y = PioStepper::new(&mut common, &program, sm1, p.PIN_6, p.PIN_5, p.PIN_7, true);
    let z = PioStepper::new(&mut common, &program, sm2, p.PIN_19, p.PIN_28, p.PIN_2, true);
    let e = PioStepper::new(&mut common, &program, sm3, p.PIN_14, p.PIN_13, p.PIN_15, true);

    let segment_us = config.segment_time_us();
    let channels: [StepChannel<'static, PIO0>; MAX_MOTORS] =
        [x.into(), y.into(), z.into(), e.into()];
    let mut slot = 0;
    let motors: Motors = StepMotors(channels.map(|channel| {
        let motor = StepMotor::new(channel, &config.motors[slot], segment_us);
        slot += 1;
        motor
    }));

    info!("PIO steppers initialized");

    // Spindle PWM (SKR Pico FAN1: GPIO17, slice 0 channel B)
    let mut pwm_config = PwmConfig::default();
    pwm_config.top = SPINDLE_PWM_TOP;
    let pwm = Pwm::new_output_b(p.PWM_SLICE0, p.PIN_17, pwm_config);
    let (_, spindle_pwm) = pwm.split();
    let spindle = PwmSpindle::new(unwrap!(spindle_pwm), &config.spindle);

    let scheduler: &'static SharedScheduler = SCHEDULER.init(Mutex::new(RefCell::new(
        StepperScheduler::new(motors, spindle, &config),
    )));
    let executor = Executor::new(SyncPower::new(), &config);

    // Trampoline below the tick, both above thread mode
    interrupt::SWI_IRQ_0.set_priority(Priority::P2);
    let trampoline_spawner = EXECUTOR_TRAMPOLINE.start(interrupt::SWI_IRQ_0);
    trampoline_spawner
        .spawn(tasks::trampoline_task(scheduler, executor))
        .unwrap();

    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let tick_spawner = EXECUTOR_TICK.start(interrupt::SWI_IRQ_1);
    tick_spawner
        .spawn(tasks::tick_task(scheduler, config.tick_period_us()))
        .unwrap();

    spawner
        .spawn(tasks::command_rx_task(rx, tx, scheduler))
        .unwrap();

    info!("All tasks spawned, firmware running");
}
