//! Command serial link
//!
//! Reads newline-terminated commands from the host, submits them to the
//! command queue and answers each line with `ok` or `error <reason>`.
//! A full queue is not an error: the task waits for room, so the host
//! paces itself on the replies.
//!
//! The status query `s` is answered directly from the scheduler with
//! `status busy=<0|1> underrun=<count> dwell=<seconds>`.

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use heapless::{String, Vec};

use kinesis_core::exec::CommandProcessor;
use kinesis_core::CommandError;
use kinesis_protocol::{MAX_COMMAND_LEN, STATUS_QUERY};

use crate::channels::{estop_triggered, SharedQueue, SharedScheduler};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Longest status reply line
const STATUS_REPLY_LEN: usize = 64;

/// Wait between retries while the queue is full
const QUEUE_RETRY: Duration = Duration::from_millis(1);

/// Command RX task - receives, submits and acknowledges host commands
#[embassy_executor::task]
pub async fn command_rx_task(
    mut rx: BufferedUartRx,
    mut tx: BufferedUartTx,
    scheduler: &'static SharedScheduler,
) {
    info!("Command RX task started");

    let mut processor = CommandProcessor::new();
    let mut queue = SharedQueue;
    let mut line: Vec<u8, MAX_COMMAND_LEN> = Vec::new();
    let mut status: String<STATUS_REPLY_LEN> = String::new();
    let mut overflow = false;
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("UART read error: {:?}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            match byte {
                b'\r' => {}
                b'\n' => {
                    let reply = if overflow {
                        warn!("Command longer than {} bytes dropped", MAX_COMMAND_LEN);
                        "error Overflow\n"
                    } else if line.is_empty() {
                        continue;
                    } else if line.as_slice() == STATUS_QUERY {
                        status_reply(scheduler, &mut status)
                    } else {
                        handle_command(&line, &mut processor, &mut queue).await
                    };

                    line.clear();
                    overflow = false;

                    if let Err(e) = tx.write_all(reply.as_bytes()).await {
                        warn!("UART write error: {:?}", e);
                    }
                }
                _ => {
                    if line.push(byte).is_err() {
                        overflow = true;
                    }
                }
            }
        }
    }
}

/// Submit one command line, waiting while the queue is full
async fn handle_command(
    command: &[u8],
    processor: &mut CommandProcessor,
    queue: &mut SharedQueue,
) -> &'static str {
    loop {
        if estop_triggered() {
            return "error Halted\n";
        }

        match processor.submit(command, queue) {
            Ok(bytes) => {
                trace!("Queued {} byte payload", bytes);
                return "ok\n";
            }
            Err(CommandError::QueueFull) => Timer::after(QUEUE_RETRY).await,
            Err(e) => {
                debug!("Command rejected: {:?}", e);
                return error_reply(e);
            }
        }
    }
}

/// Format the scheduler status, read under one lock
fn status_reply<'a>(
    scheduler: &SharedScheduler,
    out: &'a mut String<STATUS_REPLY_LEN>,
) -> &'a str {
    let status = scheduler.lock(|s| s.borrow().status());

    out.clear();
    if writeln!(out, "status {}", status).is_err() {
        return "error Overflow\n";
    }
    out.as_str()
}

/// Reply line for a rejected command
fn error_reply(err: CommandError) -> &'static str {
    match err {
        CommandError::BadFloat => "error BadFloat\n",
        CommandError::InvalidArguments => "error InvalidArguments\n",
        CommandError::AllZeroScurveTimes => "error AllZeroScurveTimes\n",
        CommandError::NegativeScurveTime => "error NegativeScurveTime\n",
        CommandError::QueueFull => "error QueueFull\n",
        CommandError::UnknownCommand => "error UnknownCommand\n",
    }
}
