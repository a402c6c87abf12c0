//! Simple TOML parser for machine configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the machine description. It does NOT support all of TOML.
//!
//! Supported features:
//! - Key = value pairs (string, float, integer, boolean)
//! - [section] headers
//! - [motor.N] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys outside section headers

use kinesis_core::config::{ConfigError, MotionConfig, MotorConfig, MAX_MOTORS};
use kinesis_protocol::axis_from_letter;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Key not valid in its section
    UnknownKey,
    /// Motor slot is out of range or defined twice
    InvalidSlot,
    /// A motor slot below the highest one is missing
    MissingMotor,
    /// Parsed values failed validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(err: ConfigError) -> Self {
        ParseError::Invalid(err)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Motion,
    Motor(usize),
    Spindle,
}

/// Parse TOML configuration into a validated MotionConfig
pub fn parse_config(input: &str) -> Result<MotionConfig, ParseError> {
    let mut config = MotionConfig::default();
    let mut motors: [Option<MotorConfig>; MAX_MOTORS] = [None; MAX_MOTORS];
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;

            if let Section::Motor(slot) = section {
                if motors[slot].is_some() {
                    return Err(ParseError::InvalidSlot);
                }
                motors[slot] = Some(MotorConfig::new(slot as u8, 0.0));
            }
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config, &mut motors)?;
        }
    }

    config.motors.clear();
    let count = motors.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    for motor in &motors[..count] {
        let motor = motor.ok_or(ParseError::MissingMotor)?;
        config
            .motors
            .push(motor)
            .map_err(|_| ParseError::InvalidSlot)?;
    }

    config.validate()?;
    Ok(config)
}

/// Parse section header like "motion" or "motor.2"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    if let Some(slot) = header.strip_prefix("motor.") {
        let slot: usize = parse_int(slot)?;
        if slot >= MAX_MOTORS {
            return Err(ParseError::InvalidSlot);
        }
        return Ok(Section::Motor(slot));
    }

    match header {
        "motion" => Ok(Section::Motion),
        "spindle" => Ok(Section::Spindle),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Apply one key to the section being parsed
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MotionConfig,
    motors: &mut [Option<MotorConfig>; MAX_MOTORS],
) -> Result<(), ParseError> {
    match section {
        Section::Root => Err(ParseError::UnknownKey),
        Section::Motion => {
            match key {
                "tick_period" => config.tick_period = parse_float(value)?,
                "min_velocity" => config.min_velocity = parse_float(value)?,
                "min_dwell" => config.min_dwell = parse_float(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Motor(slot) => {
            let motor = motors[slot].as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "axis" => motor.axis = parse_axis(value)?,
                "steps_per_unit" => motor.steps_per_unit = parse_float(value)?,
                "reverse" => motor.reverse = parse_bool(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Spindle => {
            match key {
                "max_power" => config.spindle.max_power = parse_float(value)?,
                "dynamic" => config.spindle.dynamic = parse_bool(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
    }
}

/// Parse key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = if let Some(hash_pos) = value.find('#') {
        // Make sure # is not inside a string
        let quote_count = value[..hash_pos].matches('"').count();
        if quote_count % 2 == 0 {
            value[..hash_pos].trim()
        } else {
            value
        }
    } else {
        value
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        Ok(&value[1..value.len() - 1])
    } else {
        // Allow unquoted strings for simple values
        Ok(value)
    }
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a float value, rejecting NaN and infinities
fn parse_float(value: &str) -> Result<f32, ParseError> {
    let v: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ParseError::InvalidValue)
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse an axis name like "x" into its index
fn parse_axis(value: &str) -> Result<u8, ParseError> {
    match parse_string(value)?.as_bytes() {
        [letter] => axis_from_letter(*letter)
            .map(|axis| axis as u8)
            .ok_or(ParseError::InvalidValue),
        _ => Err(ParseError::InvalidValue),
    }
}
