//! Kinesis command wire format
//!
//! This crate defines the line-oriented text protocol spoken between the
//! host (G-code planner) and the motion controller. Every command is a
//! single line of printable ASCII:
//!
//! ```text
//! ┌────────┬──────────────────────────────────────────────┐
//! │ OPCODE │ ARGUMENTS                                    │
//! │ 1B     │ fixed-width floats, axis words, phase words  │
//! └────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Floats are always six characters wide (unpadded base64 of the four
//! little-endian IEEE-754 bytes), which lets arguments be packed without
//! separators. A line move looks like:
//!
//! ```text
//! l <vel> <accel> <jerk> x<f> y<f> ... 0<t> 1<t> ... 6<t>
//! ```
//!
//! (spaces shown for readability only; the wire form has none).
//!
//! The single line `s` asks for the scheduler status instead of queueing
//! anything.

#![no_std]
#![deny(unsafe_code)]

pub mod axes;
pub mod codec;
pub mod command;

pub use axes::{axis_from_letter, axis_letter, Axes, AXES, AXIS_LETTERS};
pub use codec::{decode_float, encode_float, DecodeError, EncodeError, FLOAT_LEN};
pub use command::{
    CommandReader, CommandWriter, DwellCommand, LineCommand, Opcode, SyncPowerCommand,
    MAX_COMMAND_LEN, PHASES, STATUS_QUERY,
};
