//! Motion driver lifecycle and producer API.
//!
//! # Lifecycle
//!
//! | From | Operation | To |
//! |------|-----------|----|
//! | `Uninit` | [`MotionDriver::start`] | `Stopped` |
//! | `Stopped` | tick: promoted buffer leaves its delay | `Ready` |
//! | `Ready` | tick: active buffer exhausted, nothing pending | `Stopped` |
//! | `Stopped` / `Ready` | [`MotionDriver::stop`] | `Uninit` |
//!
//! All methods take `&self`; the driver can be shared between a lifecycle
//! thread and any number of producers. Producers block only on the command
//! queue, which outlives a start/stop cycle: anything still queued at `stop`
//! is picked up after the next `start`.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use motion_common::config::WorkerConfig;
use motion_common::consts::TICK_PERIOD_US_MAX;
use motion_common::state::MotionState;
use motion_hal::{Actuator, PositionSensor, TickFn, TickTimer};
use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use tracing::{debug, info, warn};

use crate::control::{FeedbackController, Pid};
use crate::error::{EnqueueError, MotionError};
use crate::pool::{BufferPool, SealedTrajectory, TrajectoryBuf};
use crate::queue::{CommandQueue, PostError, Timeout};
use crate::slot::PendingSlot;
use crate::tick::{DriverShared, DriverStats, TickHandler};
use crate::worker;

/// Resources bound to a driver by [`MotionDriver::start`].
pub struct MotionBindings<G> {
    /// Buffer pool shared with producers.
    pub pool: Arc<BufferPool>,
    /// Command queue fed by producers and drained by the worker.
    pub queue: Arc<CommandQueue<SealedTrajectory>>,
    /// Worker thread name and stack size.
    pub worker: WorkerConfig,
    /// Periodic tick source.
    pub timer: Box<dyn TickTimer>,
    pub tick_period: Duration,
    /// Controller coefficients installed before the first tick.
    pub gains: G,
    pub sensor: Box<dyn PositionSensor>,
    pub actuator: Box<dyn Actuator>,
}

struct Running {
    pool: Arc<BufferPool>,
    queue: Arc<CommandQueue<SealedTrajectory>>,
    pending: Arc<PendingSlot>,
    timer: Box<dyn TickTimer>,
    worker: JoinHandle<()>,
}

/// One actuator's motion driver.
pub struct MotionDriver<C: FeedbackController = Pid> {
    handler: Arc<Mutex<TickHandler<C>>>,
    gains: Arc<Mutex<Option<C::Gains>>>,
    shared: Arc<DriverShared>,
    running: Mutex<Option<Running>>,
}

impl<C: FeedbackController> MotionDriver<C> {
    /// Driver in `Uninit` owning `controller`.
    pub fn new(controller: C) -> Self {
        let gains = Arc::new(Mutex::new(None));
        let shared = Arc::new(DriverShared::default());
        let handler = TickHandler::new(controller, Arc::clone(&gains), Arc::clone(&shared));
        Self {
            handler: Arc::new(Mutex::new(handler)),
            gains,
            shared,
            running: Mutex::new(None),
        }
    }

    /// Bind resources, spawn the worker and arm the tick timer.
    ///
    /// # Errors
    /// `AlreadyStarted` when running, `InvalidTickPeriod` for a zero period or
    /// one above `TICK_PERIOD_US_MAX`,
    /// `WorkerSpawn` / `Timer` when a context cannot be started. On error the
    /// driver stays in `Uninit`.
    pub fn start(&self, bindings: MotionBindings<C::Gains>) -> Result<(), MotionError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(MotionError::AlreadyStarted);
        }
        let period = bindings.tick_period;
        if period.is_zero() || period > Duration::from_micros(TICK_PERIOD_US_MAX) {
            return Err(MotionError::InvalidTickPeriod(period));
        }

        let MotionBindings {
            pool,
            queue,
            worker: worker_config,
            mut timer,
            tick_period,
            gains,
            sensor,
            actuator,
        } = bindings;

        let pending = Arc::new(PendingSlot::new(Arc::clone(&pool)));
        *self.gains.lock() = None;
        self.shared.demand.clear();
        self.handler
            .lock()
            .bind(&gains, sensor, actuator, Arc::clone(&pending));
        self.shared.set_state(MotionState::Stopped);

        let worker = match worker::spawn(
            &worker_config,
            Arc::clone(&queue),
            Arc::clone(&pending),
            Arc::clone(&self.shared),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.rollback();
                return Err(MotionError::WorkerSpawn(e));
            }
        };

        let handler = Arc::clone(&self.handler);
        let tick: TickFn = Box::new(move || {
            if let Some(mut h) = handler.try_lock() {
                h.tick();
            }
        });
        if let Err(e) = timer.arm(tick_period, tick) {
            queue.close();
            let _ = worker.join();
            queue.reopen();
            self.rollback();
            return Err(MotionError::Timer(e));
        }

        info!(
            worker = %worker_config.name,
            ?tick_period,
            pool_capacity = pool.capacity(),
            queue_capacity = queue.capacity(),
            "motion driver started"
        );

        *running = Some(Running {
            pool,
            queue,
            pending,
            timer,
            worker,
        });
        Ok(())
    }

    /// Disarm the timer, stop the worker, release held buffers.
    ///
    /// Buffers still in the queue stay there for the next `start`.
    pub fn stop(&self) -> Result<(), MotionError> {
        let mut running = self.running.lock();
        let Some(Running {
            pool,
            queue,
            pending,
            mut timer,
            worker,
        }) = running.take()
        else {
            return Err(MotionError::NotStarted);
        };

        let disarmed = timer.disarm();
        queue.close();
        let joined = worker.join();
        queue.reopen();

        self.handler.lock().unbind();
        drop(pending.take());
        *self.gains.lock() = None;
        self.shared.set_state(MotionState::Uninit);

        info!(
            queued = queue.len(),
            outstanding = pool.outstanding(),
            "motion driver stopped"
        );

        disarmed?;
        joined.map_err(|_| MotionError::WorkerPanicked)
    }

    /// Stage new controller coefficients; applied at the start of the next tick.
    pub fn set_coefficients(&self, gains: C::Gains) -> Result<(), MotionError> {
        if self.running.lock().is_none() {
            return Err(MotionError::NotStarted);
        }
        debug!(?gains, "coefficients staged");
        *self.gains.lock() = Some(gains);
        Ok(())
    }

    /// Claim a cleared buffer from the bound pool. `None` when exhausted or not started.
    pub fn allocate(&self) -> Option<TrajectoryBuf> {
        let pool = self.running.lock().as_ref().map(|r| Arc::clone(&r.pool))?;
        pool.allocate()
    }

    /// Seal `buffer` and post it to the command queue.
    pub fn enqueue(&self, buffer: TrajectoryBuf, timeout: Timeout) -> Result<(), EnqueueError> {
        let sealed = buffer.seal()?;
        self.enqueue_sealed(sealed, timeout)
    }

    /// Post an already sealed buffer, e.g. one handed back by a timed-out `enqueue`.
    pub fn enqueue_sealed(
        &self,
        buffer: SealedTrajectory,
        timeout: Timeout,
    ) -> Result<(), EnqueueError> {
        let queue = {
            let running = self.running.lock();
            let Some(r) = running.as_ref() else {
                return Err(EnqueueError::NotStarted);
            };
            if !buffer.belongs_to(&r.pool) {
                return Err(EnqueueError::ForeignPool(buffer));
            }
            Arc::clone(&r.queue)
        };

        queue.post(buffer, timeout).map_err(|e| match e {
            PostError::Timeout(b) => EnqueueError::Timeout(b),
            PostError::Closed(b) => EnqueueError::Closed(b),
        })
    }

    /// Last sampled position. Lock-free, callable from any context.
    #[inline]
    pub fn position(&self) -> f32 {
        self.shared.position()
    }

    #[inline]
    pub fn state(&self) -> MotionState {
        self.shared.state()
    }

    pub fn stats(&self) -> DriverStats {
        self.shared.stats.snapshot()
    }

    /// Block until the tick has consumed or run out of work, or `timeout` passes.
    /// Any number of threads may wait; each raised signal releases one of them.
    pub fn wait_for_demand(&self, timeout: Duration) -> bool {
        self.shared.demand.wait_timeout(timeout)
    }

    /// True while a pending buffer waits for promotion.
    pub fn has_pending(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| r.pending.is_occupied())
    }

    fn rollback(&self) {
        self.handler.lock().unbind();
        self.shared.set_state(MotionState::Uninit);
    }
}

impl<C: FeedbackController> Drop for MotionDriver<C> {
    fn drop(&mut self) {
        if self.running.get_mut().is_some() {
            if let Err(e) = self.stop() {
                warn!("motion driver stop on drop failed: {e}");
            }
        }
    }
}

assert_impl_all!(MotionDriver<Pid>: Send, Sync);
