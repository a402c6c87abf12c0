//! Emergency stop latch

use crate::error::Fault;

/// Emergency stop state
///
/// Latches the first fault reported. Later faults are ignored until the
/// latch is reset, so the recorded cause is always the original one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EStop {
    fault: Option<Fault>,
}

impl EStop {
    /// Create a released latch
    pub const fn new() -> Self {
        Self { fault: None }
    }

    /// Report a fault
    ///
    /// Returns true if this fault engaged the latch.
    pub fn trigger(&mut self, fault: Fault) -> bool {
        if self.fault.is_some() {
            return false;
        }
        self.fault = Some(fault);
        true
    }

    /// Route a result through the latch, passing the success value on
    pub fn check<T>(&mut self, result: Result<T, Fault>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(fault) => {
                self.trigger(fault);
                None
            }
        }
    }

    /// Check if the latch is engaged
    pub fn is_triggered(&self) -> bool {
        self.fault.is_some()
    }

    /// Fault that engaged the latch
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Release the latch
    pub fn reset(&mut self) {
        self.fault = None;
    }
}
