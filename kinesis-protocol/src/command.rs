//! Command reading and writing
//!
//! [`CommandReader`] is a forward-only cursor over one received command
//! line. Argument order and validation belong to the command handlers in
//! the core crate; this module only knows how the individual fields are
//! spelled on the wire.
//!
//! [`CommandWriter`] and the typed command structs build command lines for
//! host tools and tests.

use heapless::Vec;

use crate::axes::{axis_from_letter, axis_letter, Axes, AXES};
use crate::codec::{decode_float, encode_float, DecodeError, EncodeError, FLOAT_LEN};

/// Number of S-curve phases addressable by a line command
pub const PHASES: usize = 7;

/// Longest command line produced by [`CommandWriter`]
pub const MAX_COMMAND_LEN: usize = 128;

/// Status query line, answered at once and never queued
pub const STATUS_QUERY: &[u8] = b"s";

/// Command opcodes (first byte of every command line)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// Jerk-limited line move
    Line,
    /// Timed pause with no motion
    Dwell,
    /// Power level change at a distance offset into the next line
    SyncPower,
}

impl Opcode {
    /// Wire byte for this opcode
    pub const fn byte(self) -> u8 {
        match self {
            Opcode::Line => b'l',
            Opcode::Dwell => b'd',
            Opcode::SyncPower => b'p',
        }
    }

    /// Look up the opcode for a wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'l' => Some(Opcode::Line),
            b'd' => Some(Opcode::Dwell),
            b'p' => Some(Opcode::SyncPower),
            _ => None,
        }
    }
}

/// Cursor over a received command line
#[derive(Debug, Clone)]
pub struct CommandReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> CommandReader<'a> {
    /// Create a reader positioned at the first byte
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Look at the next byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consume the next byte
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume the opcode byte
    ///
    /// Returns the raw byte on failure so the caller can report it.
    pub fn read_opcode(&mut self) -> Result<Opcode, Option<u8>> {
        let byte = self.next_byte().ok_or(None)?;
        Opcode::from_byte(byte).ok_or(Some(byte))
    }

    /// Consume one float field
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        let value = decode_float(&self.input[self.pos..])?;
        self.pos += FLOAT_LEN;
        Ok(value)
    }

    /// Consume axis words, overwriting the matching entries of `target`
    ///
    /// Stops at the first byte that is not an axis letter. Axes that do not
    /// appear keep their incoming value.
    pub fn read_axes(&mut self, target: &mut Axes) -> Result<(), DecodeError> {
        while let Some(axis) = self.peek().and_then(axis_from_letter) {
            self.pos += 1;
            target[axis] = self.read_float()?;
        }
        Ok(())
    }

    /// Consume a phase digit (`0`..=`6`) if one is next
    pub fn read_phase(&mut self) -> Option<usize> {
        match self.peek() {
            Some(c @ b'0'..=b'6') => {
                self.pos += 1;
                Some((c - b'0') as usize)
            }
            _ => None,
        }
    }

    /// Check whether all input has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unconsumed input
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    /// Require that all input has been consumed
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::InvalidArguments)
        }
    }
}

/// Builder for command lines
#[derive(Debug, Clone)]
pub struct CommandWriter {
    buffer: Vec<u8, MAX_COMMAND_LEN>,
}

impl CommandWriter {
    /// Start a command with the given opcode
    pub fn new(opcode: Opcode) -> Self {
        let mut buffer = Vec::new();
        // Capacity is far above one byte
        let _ = buffer.push(opcode.byte());
        Self { buffer }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.buffer
            .extend_from_slice(bytes)
            .map_err(|_| EncodeError::BufferTooSmall)
    }

    /// Append a bare float field
    pub fn float(&mut self, value: f32) -> Result<&mut Self, EncodeError> {
        let encoded = encode_float(value)?;
        self.push_bytes(&encoded)?;
        Ok(self)
    }

    /// Append an axis word
    pub fn axis(&mut self, axis: usize, value: f32) -> Result<&mut Self, EncodeError> {
        let letter = axis_letter(axis).ok_or(EncodeError::InvalidValue)?;
        self.push_bytes(&[letter])?;
        self.float(value)
    }

    /// Append a phase word
    pub fn phase(&mut self, phase: usize, seconds: f32) -> Result<&mut Self, EncodeError> {
        if phase >= PHASES {
            return Err(EncodeError::InvalidValue);
        }
        self.push_bytes(&[b'0' + phase as u8])?;
        self.float(seconds)
    }

    /// Encoded bytes so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Finish and return the encoded line
    pub fn finish(self) -> Vec<u8, MAX_COMMAND_LEN> {
        self.buffer
    }
}

/// Jerk-limited line move
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCommand {
    /// Velocity at the end of the move
    pub target_vel: f32,
    /// Maximum acceleration
    pub max_accel: f32,
    /// Maximum jerk
    pub max_jerk: f32,
    /// Target coordinates (`None` keeps the current position)
    pub target: [Option<f32>; AXES],
    /// Phase durations in seconds
    pub times: [f32; PHASES],
}

impl LineCommand {
    /// Encode as a command line
    ///
    /// Zero-duration phases are omitted.
    pub fn encode(&self) -> Result<Vec<u8, MAX_COMMAND_LEN>, EncodeError> {
        let mut writer = CommandWriter::new(Opcode::Line);
        writer
            .float(self.target_vel)?
            .float(self.max_accel)?
            .float(self.max_jerk)?;

        for (axis, value) in self.target.iter().enumerate() {
            if let Some(value) = value {
                writer.axis(axis, *value)?;
            }
        }

        for (phase, &time) in self.times.iter().enumerate() {
            if time != 0.0 {
                writer.phase(phase, time)?;
            }
        }

        Ok(writer.finish())
    }
}

/// Timed pause
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DwellCommand {
    /// Pause length in seconds
    pub seconds: f32,
}

impl DwellCommand {
    /// Encode as a command line
    pub fn encode(&self) -> Result<Vec<u8, MAX_COMMAND_LEN>, EncodeError> {
        let mut writer = CommandWriter::new(Opcode::Dwell);
        writer.float(self.seconds)?;
        Ok(writer.finish())
    }
}

/// Power change at a distance offset into the following line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncPowerCommand {
    /// Distance along the next line at which the power applies
    pub offset: f32,
    /// Power level (0.0..=1.0)
    pub power: f32,
}

impl SyncPowerCommand {
    /// Encode as a command line
    pub fn encode(&self) -> Result<Vec<u8, MAX_COMMAND_LEN>, EncodeError> {
        let mut writer = CommandWriter::new(Opcode::SyncPower);
        writer.float(self.offset)?.float(self.power)?;
        Ok(writer.finish())
    }
}
