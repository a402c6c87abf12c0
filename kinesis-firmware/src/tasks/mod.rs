//! Embassy async tasks
//!
//! Each task runs independently and communicates via the shared state in
//! `channels`.

pub mod command_rx;
pub mod tick;
pub mod trampoline;

pub use command_rx::command_rx_task;
pub use tick::tick_task;
pub use trampoline::trampoline_task;
