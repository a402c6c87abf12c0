//! Scheduler operations used by the move worker

use kinesis_protocol::Axes;

use crate::error::Fault;
use crate::traits::PowerTable;

/// Trait for the scheduler side of the move pipeline
///
/// The `prep_*` calls fill the single prepared-move slot. They fail with
/// [`Fault::StepperNotReady`] while a prepared move is still outstanding.
pub trait StepperPort {
    /// Prepare a move of every motor to its axis of `target`
    fn prep_line(&mut self, target: &Axes) -> Result<(), Fault>;

    /// Stage the power table for the next move
    fn prep_power(&mut self, table: &PowerTable) -> Result<(), Fault>;

    /// Prepare a dwell with its power table
    fn prep_dwell(&mut self, seconds: f32, table: &PowerTable) -> Result<(), Fault>;

    /// Check if motors or a dwell are running
    fn is_busy(&self) -> bool;

    /// Promote the prepared move so the next tick loads it
    ///
    /// Fails with [`Fault::ExpectedMove`] if nothing was prepared.
    fn mark_move_ready(&mut self) -> Result<(), Fault>;

    /// Count one underrun
    fn record_underrun(&mut self);

    /// Put the power output into its idle state
    fn power_idle(&mut self);

    /// Finish the outstanding move request
    fn end_request(&mut self);
}
