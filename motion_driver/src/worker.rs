//! Worker task: moves buffers from the command queue into the pending slot.
//!
//! The worker is the only driver context that blocks, and it blocks only in
//! `fetch`. A buffer already waiting in the pending slot is displaced by the
//! newer one and released. Closing the queue ends the loop.
//!
//! The worker never waits on the tick's demand signal: `fetch` already
//! parks it until a producer enqueues. Demand paces producers instead,
//! through [`MotionDriver::wait_for_demand`](crate::MotionDriver::wait_for_demand).

use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use motion_common::config::WorkerConfig;
use tracing::{debug, trace, warn};

use crate::pool::SealedTrajectory;
use crate::queue::{CommandQueue, FetchError, Timeout};
use crate::slot::PendingSlot;
use crate::tick::DriverShared;

/// Spawn the worker thread named and sized per `config`.
pub fn spawn(
    config: &WorkerConfig,
    queue: Arc<CommandQueue<SealedTrajectory>>,
    pending: Arc<PendingSlot>,
    shared: Arc<DriverShared>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(config.name.clone())
        .stack_size(config.stack_size)
        .spawn(move || run(&queue, &pending, &shared))
}

fn run(queue: &CommandQueue<SealedTrajectory>, pending: &PendingSlot, shared: &DriverShared) {
    debug!("worker started");

    loop {
        let buffer = match queue.fetch(Timeout::Infinite) {
            Ok(buffer) => buffer,
            Err(FetchError::Closed) => break,
            Err(FetchError::Timeout) => continue,
        };
        let index = buffer.index();

        match pending.replace(buffer) {
            Ok(None) => {
                shared.stats.accepted.fetch_add(1, Ordering::Relaxed);
                trace!(index, "buffer pending");
            }
            Ok(Some(displaced)) => {
                let displaced_index = displaced.index();
                drop(displaced);
                shared.stats.displaced.fetch_add(1, Ordering::Relaxed);
                shared.stats.accepted.fetch_add(1, Ordering::Relaxed);
                debug!(index, displaced = displaced_index, "pending buffer displaced");
            }
            Err(foreign) => {
                warn!(index = foreign.index(), "dropping buffer from a foreign pool");
            }
        }
    }

    debug!("worker exiting");
}
