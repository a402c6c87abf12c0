//! PWM spindle output

use embedded_hal::pwm::SetDutyCycle;

use kinesis_core::config::SpindleConfig;
use kinesis_core::traits::{PowerOutput, PowerUpdate};

/// Spindle or laser driven by one PWM channel
///
/// Power levels are clamped to 0.0..=1.0 and scaled by the configured
/// maximum. In dynamic (laser) mode the output is switched off whenever
/// motion runs dry and restored by the next power update.
pub struct PwmSpindle<P> {
    pwm: P,
    max_power: f32,
    dynamic: bool,
    /// Last requested power level
    power: f32,
    /// Failed duty cycle writes
    errors: u32,
}

impl<P: SetDutyCycle> PwmSpindle<P> {
    /// Create a spindle with the output off
    pub fn new(pwm: P, config: &SpindleConfig) -> Self {
        let mut spindle = Self {
            pwm,
            max_power: config.max_power.clamp(0.0, 1.0),
            dynamic: config.dynamic,
            power: 0.0,
            errors: 0,
        };
        spindle.write(0.0);
        spindle
    }

    /// Last requested power level
    pub fn power(&self) -> f32 {
        self.power
    }

    /// Number of duty cycle writes the PWM peripheral rejected
    pub fn error_count(&self) -> u32 {
        self.errors
    }

    /// PWM channel
    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    fn write(&mut self, level: f32) {
        let max = self.pwm.max_duty_cycle() as f32;
        let duty = (level * self.max_power * max + 0.5) as u16;
        if self.pwm.set_duty_cycle(duty).is_err() {
            self.errors = self.errors.saturating_add(1);
        }
    }
}

impl<P: SetDutyCycle> PowerOutput for PwmSpindle<P> {
    fn apply(&mut self, update: PowerUpdate) {
        if !update.set {
            return;
        }

        self.power = update.power.clamp(0.0, 1.0);
        self.write(self.power);
    }

    fn idle(&mut self) {
        if self.dynamic {
            self.write(0.0);
        }
    }
}
