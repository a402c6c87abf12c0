//! Exec layer
//!
//! The producer side ([`CommandProcessor`]) parses command lines and queues
//! compact payloads. The consumer side ([`Executor`]) runs in the
//! trampoline context, pops payloads and turns them into prepared moves.

pub mod executor;
pub mod processor;
pub mod queue;

pub use executor::{ExecState, ExecStatus, Executor};
pub use processor::CommandProcessor;
pub use queue::{
    CommandQueue, CommandSink, CommandSource, DwellPayload, Payload, PowerPayload,
    QueuedCommand, MAX_PAYLOAD,
};
