//! Build script for kinesis-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates machine.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Driver slots on the board
const MOTOR_SLOTS: usize = 4;

/// Axis names accepted in `[motor.N]`
const AXES: [&str; 4] = ["x", "y", "z", "a"];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate machine.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=machine.toml");

    let config_path = Path::new("machine.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: machine.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a machine.toml configuration file.        ║\n\
            ║  Please create one in the kinesis-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read machine.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in machine.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_motion(&config, &mut errors);
    validate_motors(&config, &mut errors);
    validate_spindle(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid machine configuration                            ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=machine.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read a number that may be written as an integer or a float
fn number(value: Option<&toml::Value>) -> Option<f64> {
    match value? {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

/// Validate the [motion] section
fn validate_motion(config: &toml::Value, errors: &mut Vec<String>) {
    let motion = match config.get("motion") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[motion] must be a table".to_string());
            return;
        }
        None => {
            errors.push("Missing [motion] section".to_string());
            return;
        }
    };

    match number(motion.get("tick_period")) {
        Some(period) if period > 0.0 && period <= 0.1 => {}
        Some(_) => errors.push("[motion] tick_period must be in (0, 0.1] seconds".to_string()),
        None => errors.push("[motion] missing numeric 'tick_period'".to_string()),
    }

    for key in ["min_velocity", "min_dwell"] {
        if let Some(value) = motion.get(key) {
            match number(Some(value)) {
                Some(v) if v >= 0.0 => {}
                _ => errors.push(format!("[motion] {} must be a number >= 0", key)),
            }
        }
    }
}

/// Validate the [motor.N] sections
fn validate_motors(config: &toml::Value, errors: &mut Vec<String>) {
    let motors = match config.get("motor") {
        Some(toml::Value::Table(t)) => t,
        _ => {
            errors.push("Missing [motor.N] sections".to_string());
            return;
        }
    };

    for slot in 0..MOTOR_SLOTS {
        if !motors.contains_key(&slot.to_string()) {
            errors.push(format!("Missing [motor.{}] (board has {} slots)", slot, MOTOR_SLOTS));
        }
    }

    for (name, motor) in motors {
        match name.parse::<usize>() {
            Ok(slot) if slot < MOTOR_SLOTS => {}
            _ => {
                errors.push(format!("[motor.{}] is not a slot 0-{}", name, MOTOR_SLOTS - 1));
                continue;
            }
        }

        let motor = match motor {
            toml::Value::Table(t) => t,
            _ => {
                errors.push(format!("[motor.{}] must be a table", name));
                continue;
            }
        };

        match motor.get("axis") {
            Some(toml::Value::String(axis)) if AXES.contains(&axis.as_str()) => {}
            Some(_) => errors.push(format!("[motor.{}] axis must be x, y, z or a", name)),
            None => errors.push(format!("[motor.{}] missing 'axis'", name)),
        }

        match number(motor.get("steps_per_unit")) {
            Some(steps) if steps > 0.0 => {}
            Some(_) => errors.push(format!("[motor.{}] steps_per_unit must be > 0", name)),
            None => errors.push(format!("[motor.{}] missing numeric 'steps_per_unit'", name)),
        }

        if let Some(reverse) = motor.get("reverse") {
            if !reverse.is_bool() {
                errors.push(format!("[motor.{}] reverse must be true or false", name));
            }
        }
    }
}

/// Validate the optional [spindle] section
fn validate_spindle(config: &toml::Value, errors: &mut Vec<String>) {
    let spindle = match config.get("spindle") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[spindle] must be a table".to_string());
            return;
        }
        None => return,
    };

    if let Some(value) = spindle.get("max_power") {
        match number(Some(value)) {
            Some(p) if p > 0.0 && p <= 1.0 => {}
            _ => errors.push("[spindle] max_power must be in (0, 1]".to_string()),
        }
    }

    if let Some(dynamic) = spindle.get("dynamic") {
        if !dynamic.is_bool() {
            errors.push("[spindle] dynamic must be true or false".to_string());
        }
    }
}
