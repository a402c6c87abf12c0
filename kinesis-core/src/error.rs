//! Error types
//!
//! [`CommandError`] is returned to the sender of a rejected command and
//! never changes any state. [`Fault`] is a broken runtime contract; every
//! fault ends in the emergency stop.

use kinesis_protocol::DecodeError;

/// Reasons a submitted command is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A float argument failed to decode
    BadFloat,
    /// Arguments are out of range or trailing input remains
    InvalidArguments,
    /// A line move has no nonzero phase
    AllZeroScurveTimes,
    /// A line move has a negative phase duration
    NegativeScurveTime,
    /// The command queue has no room for the payload
    QueueFull,
    /// Opcode is not recognized
    UnknownCommand,
}

impl From<DecodeError> for CommandError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::BadFloat => CommandError::BadFloat,
            DecodeError::InvalidArguments => CommandError::InvalidArguments,
        }
    }
}

/// Fatal runtime faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// A move was prepared while the previous one was still outstanding
    StepperNotReady,
    /// The exec layer reported a move but none was prepared
    ExpectedMove,
    /// A queued payload could not be decoded
    BadDescriptor,
    /// A motor target lies outside the trackable step range
    PositionOverflow,
    /// A segment needs more steps than the pulse generator can emit in time
    StepRateExceeded,
}
