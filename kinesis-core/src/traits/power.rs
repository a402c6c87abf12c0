//! Spindle and laser power traits
//!
//! Power changes are synchronized with motion. For every segment the
//! interpolator fills a [`PowerTable`] with one optional update per
//! scheduler tick, and the scheduler applies one entry per tick while the
//! segment runs.

/// Power table entries per segment (also the number of ticks per segment)
pub const POWER_MAX_UPDATES: usize = 4;

/// One scheduled power change
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerUpdate {
    /// Whether this entry changes the output
    pub set: bool,
    /// Power level (0.0..=1.0)
    pub power: f32,
}

impl PowerUpdate {
    /// Entry that leaves the output unchanged
    pub const NONE: Self = Self {
        set: false,
        power: 0.0,
    };

    /// Entry that sets the output to `power`
    pub const fn set(power: f32) -> Self {
        Self { set: true, power }
    }
}

/// Power updates for one segment
pub type PowerTable = [PowerUpdate; POWER_MAX_UPDATES];

/// Table with no updates
pub const EMPTY_POWER_TABLE: PowerTable = [PowerUpdate::NONE; POWER_MAX_UPDATES];

/// Trait for the physical power output (PWM spindle, laser, ...)
pub trait PowerOutput {
    /// Apply one table entry
    ///
    /// Entries with `set == false` are ignored.
    fn apply(&mut self, update: PowerUpdate);

    /// Enter the idle state after motion runs dry
    fn idle(&mut self);
}

/// Trait for converting traveled distance into power updates
pub trait PowerInterpolator {
    /// Fill `table` with the updates due while moving from `from` to `to`
    ///
    /// Distances are measured from the start of the current line. The
    /// interval is split evenly across the table entries.
    fn load_power_updates(&mut self, table: &mut PowerTable, from: f32, to: f32);

    /// Queue a power change at `offset` into the next line
    fn queue_power(&mut self, offset: f32, power: f32);

    /// The current line finished after `length` units of travel
    ///
    /// Offsets of changes still pending are carried into the next line.
    fn end_line(&mut self, _length: f32) {}
}
