//! Machine configuration
//!
//! Timing of the real-time pipeline, the motor-to-axis map and the spindle
//! output. Firmware builds this from its embedded TOML description and
//! validates it once at boot.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use kinesis_protocol::AXES;

use crate::traits::POWER_MAX_UPDATES;

/// Maximum motors per machine
pub const MAX_MOTORS: usize = 4;

/// Default scheduler tick period in seconds (1 kHz)
pub const DEFAULT_TICK_PERIOD: f32 = 0.001;

/// Default velocity below which running dry is not counted as an underrun
pub const DEFAULT_MIN_VELOCITY: f32 = 0.01;

/// Shortest dwell the scheduler will run, in seconds
pub const DEFAULT_MIN_DWELL: f32 = 1e-4;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Tick period is zero, negative or not finite
    InvalidTickPeriod,
    /// Minimum dwell is negative or not finite
    InvalidMinDwell,
    /// Minimum velocity is negative or not finite
    InvalidMinVelocity,
    /// No motors configured
    NoMotors,
    /// Motor follows an axis that does not exist
    InvalidAxis,
    /// Steps per unit is zero, negative or not finite
    InvalidStepsPerUnit,
    /// Spindle maximum power is not positive
    InvalidMaxPower,
}

/// Per-motor configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorConfig {
    /// Axis index the motor follows
    pub axis: u8,
    /// Microsteps per machine unit (mm or degree)
    pub steps_per_unit: f32,
    /// Invert the direction output
    pub reverse: bool,
}

impl MotorConfig {
    /// Create a motor config for an axis
    pub const fn new(axis: u8, steps_per_unit: f32) -> Self {
        Self {
            axis,
            steps_per_unit,
            reverse: false,
        }
    }
}

/// Spindle / laser output configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpindleConfig {
    /// Output level corresponding to power 1.0 (fraction of full duty)
    pub max_power: f32,
    /// Turn the output off whenever motion runs dry (laser mode)
    pub dynamic: bool,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            max_power: 1.0,
            dynamic: false,
        }
    }
}

/// Complete motion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionConfig {
    /// Scheduler tick period in seconds
    pub tick_period: f32,
    /// Underrun threshold velocity
    pub min_velocity: f32,
    /// Dwells shorter than this are lengthened to it
    pub min_dwell: f32,
    /// Motors in output order
    pub motors: Vec<MotorConfig, MAX_MOTORS>,
    /// Spindle output
    pub spindle: SpindleConfig,
}

impl Default for MotionConfig {
    fn default() -> Self {
        let mut motors = Vec::new();
        for axis in 0..MAX_MOTORS.min(AXES) {
            // Capacity equals the loop bound
            let _ = motors.push(MotorConfig::new(axis as u8, 80.0));
        }

        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            min_velocity: DEFAULT_MIN_VELOCITY,
            min_dwell: DEFAULT_MIN_DWELL,
            motors,
            spindle: SpindleConfig::default(),
        }
    }
}

impl MotionConfig {
    /// Duration of one motion segment in seconds
    ///
    /// A segment spans one full power table, one entry per tick.
    pub fn segment_time(&self) -> f32 {
        self.tick_period * POWER_MAX_UPDATES as f32
    }

    /// Duration of one motion segment in microseconds
    pub fn segment_time_us(&self) -> u32 {
        (self.segment_time() * 1_000_000.0 + 0.5) as u32
    }

    /// Tick period in microseconds
    pub fn tick_period_us(&self) -> u64 {
        (self.tick_period as f64 * 1_000_000.0 + 0.5) as u64
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_period.is_finite() && self.tick_period > 0.0) {
            return Err(ConfigError::InvalidTickPeriod);
        }
        if !(self.min_dwell.is_finite() && self.min_dwell >= 0.0) {
            return Err(ConfigError::InvalidMinDwell);
        }
        if !(self.min_velocity.is_finite() && self.min_velocity >= 0.0) {
            return Err(ConfigError::InvalidMinVelocity);
        }
        if self.motors.is_empty() {
            return Err(ConfigError::NoMotors);
        }

        for motor in &self.motors {
            if motor.axis as usize >= AXES {
                return Err(ConfigError::InvalidAxis);
            }
            if !(motor.steps_per_unit.is_finite() && motor.steps_per_unit > 0.0) {
                return Err(ConfigError::InvalidStepsPerUnit);
            }
        }

        if !(self.spindle.max_power.is_finite() && self.spindle.max_power > 0.0) {
            return Err(ConfigError::InvalidMaxPower);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MotionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.motors.len(), 4);
        assert_eq!(config.segment_time_us(), 4000);
        assert_eq!(config.tick_period_us(), 1000);
    }

    #[test]
    fn test_rejects_bad_tick_period() {
        let mut config = MotionConfig::default();
        config.tick_period = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTickPeriod));

        config.tick_period = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTickPeriod));
    }

    #[test]
    fn test_rejects_empty_motor_list() {
        let mut config = MotionConfig::default();
        config.motors.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoMotors));
    }

    #[test]
    fn test_rejects_bad_motor() {
        let mut config = MotionConfig::default();
        config.motors[1].steps_per_unit = -5.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidStepsPerUnit));

        let mut config = MotionConfig::default();
        config.motors[0].axis = AXES as u8;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAxis));
    }

    #[test]
    fn test_postcard_roundtrip() {
        let mut config = MotionConfig::default();
        config.spindle.dynamic = true;
        config.motors[2].reverse = true;

        let mut buf = [0u8; 128];
        let bytes = postcard::to_slice(&config, &mut buf).unwrap();
        let decoded: MotionConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
