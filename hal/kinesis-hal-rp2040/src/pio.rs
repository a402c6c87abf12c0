//! PIO step pulse timing
//!
//! Each motor segment is handed to a PIO state machine as two FIFO words:
//! the step count minus one, then a delay count. The state machine emits
//! that many pulses and stalls on the next pull, so the CPU only touches
//! the motor once per segment.
//!
//! # Program
//!
//! ```text
//! .wrap_target
//!     pull block          ; step count - 1
//!     mov x, osr
//!     pull block          ; delay
//! step:
//!     set pins, 1
//!     mov y, osr
//! high:
//!     jmp y-- high
//!     set pins, 0
//!     mov y, osr
//! low:
//!     jmp y-- low
//!     jmp x-- step
//! .wrap
//! ```
//!
//! One step costs `2 * delay + STEP_OVERHEAD_CYCLES` PIO cycles. The state
//! machine runs at the system clock, so the delay alone sets the rate.

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Minimum pulse width in nanoseconds (2.5µs is safe for all drivers)
pub const MIN_PULSE_WIDTH_NS: u32 = 2500;

/// Fixed cycles per step outside the two delay loops
pub const STEP_OVERHEAD_CYCLES: u32 = 7;

/// Cycles the step pin stays high beyond the delay count
const HIGH_OVERHEAD_CYCLES: u32 = 2;

/// Smallest delay that still meets the minimum pulse width
pub const MIN_STEP_DELAY: u32 =
    (MIN_PULSE_WIDTH_NS as u64 * SYS_CLK_HZ as u64 / 1_000_000_000) as u32 - HIGH_OVERHEAD_CYCLES;

/// Maximum step frequency in Hz (limited by pulse width)
pub const MAX_STEP_FREQ_HZ: u32 = SYS_CLK_HZ / (2 * MIN_STEP_DELAY + STEP_OVERHEAD_CYCLES);

/// FIFO words for one pulse train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseTrain {
    /// Loop counter word (steps - 1)
    pub count: u32,
    /// Delay loop word
    pub delay: u32,
}

impl PulseTrain {
    /// Spread `steps` pulses evenly over `duration_us` microseconds
    ///
    /// Returns `None` for zero steps. Beyond [`PulseTrain::max_steps`] the
    /// delay is clamped to the pulse width limit and the train runs longer
    /// than requested.
    pub fn new(steps: u32, duration_us: u32) -> Option<Self> {
        if steps == 0 {
            return None;
        }

        let cycles = duration_us as u64 * (SYS_CLK_HZ / 1_000_000) as u64;
        let per_step = cycles / steps as u64;
        let delay = per_step.saturating_sub(STEP_OVERHEAD_CYCLES as u64) / 2;
        let delay = (delay.min(u32::MAX as u64) as u32).max(MIN_STEP_DELAY);

        Some(Self {
            count: steps - 1,
            delay,
        })
    }

    /// Most pulses that fit in `duration_us` without clamping
    pub fn max_steps(duration_us: u32) -> u32 {
        let cycles = duration_us as u64 * (SYS_CLK_HZ / 1_000_000) as u64;
        let min_period = 2 * MIN_STEP_DELAY as u64 + STEP_OVERHEAD_CYCLES as u64;
        (cycles / min_period).min(u32::MAX as u64) as u32
    }

    /// Number of pulses in the train
    pub fn steps(&self) -> u32 {
        self.count + 1
    }

    /// PIO cycles between consecutive rising edges
    pub fn period_cycles(&self) -> u64 {
        2 * self.delay as u64 + STEP_OVERHEAD_CYCLES as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_width_limit() {
        // 2.5µs at 125 MHz is 312 cycles high
        assert_eq!(MIN_STEP_DELAY + HIGH_OVERHEAD_CYCLES, 312);
        assert!(MAX_STEP_FREQ_HZ > 190_000 && MAX_STEP_FREQ_HZ < 200_000);
    }

    #[test]
    fn test_train_fills_duration() {
        // 10 steps over a 4ms segment: 50000 cycles each
        let train = PulseTrain::new(10, 4000).unwrap();
        assert_eq!(train.count, 9);
        assert_eq!(train.steps(), 10);
        assert_eq!(train.delay, 24996);
        assert!(train.period_cycles() <= 50_000);
        assert!(train.period_cycles() >= 49_998);
    }

    #[test]
    fn test_zero_steps() {
        assert_eq!(PulseTrain::new(0, 4000), None);
    }

    #[test]
    fn test_fast_train_is_clamped() {
        let train = PulseTrain::new(1000, 4000).unwrap();
        assert_eq!(train.delay, MIN_STEP_DELAY);
    }

    #[test]
    fn test_max_steps_fits_duration() {
        // 500000 cycles at 627 per step
        let max = PulseTrain::max_steps(4000);
        assert_eq!(max, 797);

        let train = PulseTrain::new(max, 4000).unwrap();
        assert!(train.period_cycles() * max as u64 <= 500_000);

        // One more pulse would overrun the segment
        let train = PulseTrain::new(max + 1, 4000).unwrap();
        assert!(train.period_cycles() * (max + 1) as u64 > 500_000);
    }
}
