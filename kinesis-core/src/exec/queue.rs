//! Command queue
//!
//! Bounded FIFO between the command processor and the executor. Entries
//! carry the opcode and a postcard payload of at most [`MAX_PAYLOAD`]
//! bytes.

use heapless::{Deque, Vec};
use serde::{Deserialize, Serialize};

use kinesis_protocol::Opcode;

use crate::error::{CommandError, Fault};

/// Largest payload a queue entry can hold
pub const MAX_PAYLOAD: usize = 96;

/// Payload storage
pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// One queued command
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueuedCommand {
    pub opcode: Opcode,
    pub payload: Payload,
}

/// Dwell command payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellPayload {
    pub seconds: f32,
}

/// Synchronous power command payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerPayload {
    pub offset: f32,
    pub power: f32,
}

/// Decode a queued payload of any type
pub(crate) fn decode_payload<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, Fault> {
    postcard::from_bytes(bytes).map_err(|_| Fault::BadDescriptor)
}

/// Trait for the consumer end of the command queue
pub trait CommandSource {
    /// Remove the oldest command
    fn pop_command(&mut self) -> Option<QueuedCommand>;
}

/// Trait for the producer end of the command queue
pub trait CommandSink {
    /// Append a command
    ///
    /// Fails with [`CommandError::QueueFull`] without modifying the queue.
    fn push_command(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), CommandError>;
}

/// Fixed-capacity command queue
#[derive(Debug, Default)]
pub struct CommandQueue<const N: usize> {
    entries: Deque<QueuedCommand, N>,
}

impl<const N: usize> CommandQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the queue is full
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Maximum number of queued commands
    pub fn capacity(&self) -> usize {
        N
    }

    /// Drop all queued commands
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<const N: usize> CommandSource for CommandQueue<N> {
    fn pop_command(&mut self) -> Option<QueuedCommand> {
        self.entries.pop_front()
    }
}

impl<const N: usize> CommandSink for CommandQueue<N> {
    fn push_command(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), CommandError> {
        if self.entries.is_full() {
            return Err(CommandError::QueueFull);
        }

        let payload = Vec::from_slice(payload).map_err(|_| CommandError::InvalidArguments)?;
        self.entries
            .push_back(QueuedCommand { opcode, payload })
            .map_err(|_| CommandError::QueueFull)
    }
}
