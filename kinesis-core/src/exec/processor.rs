//! Command processor
//!
//! Producer side of the pipeline. Parses command lines, tracks the logical
//! position reached by everything queued so far and pushes payloads onto
//! the command queue. A rejected command leaves both the position and the
//! queue untouched.

use kinesis_protocol::{Axes, CommandReader, Opcode, AXES};
use serde::Serialize;

use super::queue::{CommandSink, DwellPayload, PowerPayload, MAX_PAYLOAD};
use crate::error::CommandError;
use crate::motion::{compile_line, DESCRIPTOR_SIZE};

/// Command line parser and queue producer
#[derive(Debug, Clone, Default)]
pub struct CommandProcessor {
    position: Axes,
}

impl CommandProcessor {
    /// Create a processor at the origin
    pub const fn new() -> Self {
        Self {
            position: [0.0; AXES],
        }
    }

    /// Logical position after all queued moves
    pub fn position(&self) -> Axes {
        self.position
    }

    /// Override the logical position
    pub fn set_position(&mut self, position: &Axes) {
        self.position = *position;
    }

    /// Parse and queue one command line
    ///
    /// Returns the number of payload bytes queued.
    pub fn submit<Q: CommandSink>(
        &mut self,
        command: &[u8],
        queue: &mut Q,
    ) -> Result<usize, CommandError> {
        let mut reader = CommandReader::new(command);
        let opcode = reader
            .read_opcode()
            .map_err(|_| CommandError::UnknownCommand)?;

        match opcode {
            Opcode::Line => self.submit_line(&mut reader, queue),
            Opcode::Dwell => {
                let seconds = reader.read_float()?;
                if seconds < 0.0 {
                    return Err(CommandError::InvalidArguments);
                }
                reader.finish()?;

                push_payload(queue, Opcode::Dwell, &DwellPayload { seconds })
            }
            Opcode::SyncPower => {
                let offset = reader.read_float()?;
                let power = reader.read_float()?;
                if offset < 0.0 || !(0.0..=1.0).contains(&power) {
                    return Err(CommandError::InvalidArguments);
                }
                reader.finish()?;

                push_payload(queue, Opcode::SyncPower, &PowerPayload { offset, power })
            }
        }
    }

    fn submit_line<Q: CommandSink>(
        &mut self,
        reader: &mut CommandReader<'_>,
        queue: &mut Q,
    ) -> Result<usize, CommandError> {
        let line = compile_line(reader, &self.position)?;

        let mut buf = [0u8; DESCRIPTOR_SIZE];
        let bytes = line.encode(&mut buf)?;
        queue.push_command(Opcode::Line, bytes)?;

        self.position = line.target;
        Ok(bytes.len())
    }
}

fn push_payload<Q: CommandSink, T: Serialize>(
    queue: &mut Q,
    opcode: Opcode,
    value: &T,
) -> Result<usize, CommandError> {
    let mut buf = [0u8; MAX_PAYLOAD];
    let bytes = postcard::to_slice(value, &mut buf).map_err(|_| CommandError::InvalidArguments)?;
    queue.push_command(opcode, bytes)?;
    Ok(bytes.len())
}
