//! Move request handling
//!
//! Runs below the tick and above the command task. Each request raised by
//! the tick is answered by stepping the executor until the scheduler has a
//! move prepared or the queue runs dry.

use defmt::*;

use kinesis_core::exec::Executor;
use kinesis_core::Fault;
use kinesis_drivers::spindle::SyncPower;

use crate::channels::{SchedulerPort, SharedQueue, SharedScheduler, ESTOP, MOVE_REQUEST};

/// Trampoline task - services move requests from the tick
#[embassy_executor::task]
pub async fn trampoline_task(
    scheduler: &'static SharedScheduler,
    mut executor: Executor<SyncPower>,
) {
    info!("Trampoline task started");

    let mut port = SchedulerPort(scheduler);
    let mut queue = SharedQueue;

    loop {
        MOVE_REQUEST.wait().await;

        if let Err(fault) = executor.service_request(&mut queue, &mut port) {
            halt(fault, scheduler, &mut executor, &mut queue);
        }
    }
}

/// Latch the emergency stop and bring the pipeline to rest
fn halt(
    fault: Fault,
    scheduler: &SharedScheduler,
    executor: &mut Executor<SyncPower>,
    queue: &mut SharedQueue,
) {
    if ESTOP.lock(|estop| estop.borrow_mut().trigger(fault)) {
        error!("Emergency stop: {:?}", fault);
    }

    scheduler.lock(|s| s.borrow_mut().shutdown());
    executor.abort();
    queue.clear();

    warn!("Motion halted at {:?}", executor.position());
}
