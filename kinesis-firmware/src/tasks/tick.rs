//! Real-time scheduler tick
//!
//! Runs on the highest-priority executor and never waits on anything but
//! its ticker.

use defmt::*;
use embassy_time::{Duration, Ticker};

use crate::channels::{MoveRequest, SharedScheduler};

/// Tick task - advances the stepper scheduler once per tick period
#[embassy_executor::task]
pub async fn tick_task(scheduler: &'static SharedScheduler, period_us: u64) {
    info!("Tick task started: {} us period", period_us);

    let mut ticker = Ticker::every(Duration::from_micros(period_us));

    loop {
        ticker.next().await;
        scheduler.lock(|s| s.borrow_mut().tick(&MoveRequest));
    }
}
