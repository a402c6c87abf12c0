//! Distance-synchronized power changes
//!
//! A power breakpoint is queued with a distance offset into the next line.
//! While the line executes, each segment's distance interval is split
//! evenly across the power table and every breakpoint whose offset falls
//! inside a slice becomes that slice's update. Breakpoints the line never
//! reached keep their place along the path: at the end of the line their
//! offsets are shifted back by its length, and any already passed fire at
//! the start of the next line.

use heapless::Deque;

use kinesis_core::traits::{PowerInterpolator, PowerTable, PowerUpdate, POWER_MAX_UPDATES};

/// Maximum pending power breakpoints
pub const MAX_BREAKPOINTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    offset: f32,
    power: f32,
}

/// Power interpolator for distance-synchronized power changes
#[derive(Debug, Default)]
pub struct SyncPower {
    pending: Deque<Breakpoint, MAX_BREAKPOINTS>,
}

impl SyncPower {
    /// Create an interpolator with no pending breakpoints
    pub const fn new() -> Self {
        Self {
            pending: Deque::new(),
        }
    }

    /// Number of breakpoints not yet reached
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop all pending breakpoints
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl PowerInterpolator for SyncPower {
    fn load_power_updates(&mut self, table: &mut PowerTable, from: f32, to: f32) {
        let step = (to - from) / POWER_MAX_UPDATES as f32;

        for (i, slot) in table.iter_mut().enumerate() {
            let end = from + step * (i + 1) as f32;
            *slot = PowerUpdate::NONE;

            // Several breakpoints in one slice: the last one wins
            while let Some(bp) = self.pending.front().copied() {
                if end < bp.offset {
                    break;
                }
                *slot = PowerUpdate::set(bp.power);
                self.pending.pop_front();
            }
        }
    }

    fn queue_power(&mut self, offset: f32, power: f32) {
        let bp = Breakpoint { offset, power };
        if let Err(bp) = self.pending.push_back(bp) {
            // Full: the newest level replaces the last pending one
            if let Some(last) = self.pending.back_mut() {
                *last = bp;
            }
        }
    }

    fn end_line(&mut self, length: f32) {
        for bp in self.pending.iter_mut() {
            bp.offset = if length < bp.offset {
                bp.offset - length
            } else {
                0.0
            };
        }
    }
}
