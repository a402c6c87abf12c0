//! Configuration loading and parsing
//!
//! The machine description is embedded at build time and parsed by a
//! custom no_std parser at boot.

pub mod toml;

pub use toml::{parse_config, ParseError};
