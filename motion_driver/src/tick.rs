//! Tick handler and the state it shares with the rest of the driver.
//!
//! The handler runs once per timer period in the tick context. It must not
//! block or allocate: every cross-context access is an atomic or a
//! `try_lock`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use motion_common::state::MotionState;
use motion_hal::{Actuator, PositionSensor};
use parking_lot::Mutex;
use serde::Serialize;

use crate::control::FeedbackController;
use crate::interpolator::Interpolator;
use crate::signal::BinarySignal;
use crate::slot::PendingSlot;

pub use crate::interpolator::{TickEvents, TickOutput};

// ─── Shared State ───────────────────────────────────────────────────

/// Monotonic counters, written by the tick and worker contexts.
#[derive(Debug, Default)]
pub struct StatsCounters {
    pub ticks: AtomicU64,
    pub promotions: AtomicU64,
    pub supersessions: AtomicU64,
    pub exhaustions: AtomicU64,
    pub accepted: AtomicU64,
    pub displaced: AtomicU64,
}

/// Point-in-time copy of [`StatsCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DriverStats {
    /// Ticks run while started.
    pub ticks: u64,
    /// Pending buffers made active.
    pub promotions: u64,
    /// Open-ended active buffers replaced at a boundary.
    pub supersessions: u64,
    /// Active buffers that ran out of loops.
    pub exhaustions: u64,
    /// Buffers the worker moved into the pending slot.
    pub accepted: u64,
    /// Pending buffers replaced before the tick took them.
    pub displaced: u64,
}

impl StatsCounters {
    pub fn snapshot(&self) -> DriverStats {
        DriverStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            supersessions: self.supersessions.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            displaced: self.displaced.load(Ordering::Relaxed),
        }
    }

    fn record(&self, events: TickEvents) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if events.contains(TickEvents::PROMOTED) {
            self.promotions.fetch_add(1, Ordering::Relaxed);
        }
        if events.contains(TickEvents::SUPERSEDED) {
            self.supersessions.fetch_add(1, Ordering::Relaxed);
        }
        if events.contains(TickEvents::EXHAUSTED) {
            self.exhaustions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// State readable from any context without locking.
#[derive(Debug)]
pub struct DriverShared {
    state: AtomicU8,
    /// f32 bits of the last sampled position.
    position: AtomicU32,
    pub demand: BinarySignal,
    pub stats: StatsCounters,
}

impl Default for DriverShared {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(MotionState::Uninit as u8),
            position: AtomicU32::new(0f32.to_bits()),
            demand: BinarySignal::new(),
            stats: StatsCounters::default(),
        }
    }
}

impl DriverShared {
    #[inline]
    pub fn state(&self) -> MotionState {
        MotionState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    #[inline]
    pub fn set_state(&self, state: MotionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn position(&self) -> f32 {
        f32::from_bits(self.position.load(Ordering::Acquire))
    }

    #[inline]
    fn set_position(&self, position: f32) {
        self.position.store(position.to_bits(), Ordering::Release);
    }
}

// ─── Handler ────────────────────────────────────────────────────────

struct Bound {
    sensor: Box<dyn PositionSensor>,
    actuator: Box<dyn Actuator>,
    pending: Arc<PendingSlot>,
}

/// Everything the tick context owns.
pub struct TickHandler<C: FeedbackController> {
    controller: C,
    interpolator: Interpolator,
    io: Option<Bound>,
    gains: Arc<Mutex<Option<C::Gains>>>,
    shared: Arc<DriverShared>,
}

impl<C: FeedbackController> TickHandler<C> {
    pub fn new(
        controller: C,
        gains: Arc<Mutex<Option<C::Gains>>>,
        shared: Arc<DriverShared>,
    ) -> Self {
        Self {
            controller,
            interpolator: Interpolator::new(),
            io: None,
            gains,
            shared,
        }
    }

    /// Attach hooks and the pending slot; the next tick starts from `Stopped`.
    pub fn bind(
        &mut self,
        initial_gains: &C::Gains,
        sensor: Box<dyn PositionSensor>,
        actuator: Box<dyn Actuator>,
        pending: Arc<PendingSlot>,
    ) {
        self.controller.configure(initial_gains);
        self.controller.reset();
        self.interpolator.reset();
        self.io = Some(Bound {
            sensor,
            actuator,
            pending,
        });
    }

    /// Detach hooks, release the active buffer and reset the controller.
    pub fn unbind(&mut self) {
        self.io = None;
        self.interpolator.reset();
        self.controller.reset();
    }

    pub fn is_bound(&self) -> bool {
        self.io.is_some()
    }

    #[inline]
    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    #[inline]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// One control period. No-op while unbound.
    pub fn tick(&mut self) -> TickEvents {
        let Some(io) = self.io.as_mut() else {
            return TickEvents::empty();
        };

        if let Some(mut mailbox) = self.gains.try_lock() {
            if let Some(gains) = mailbox.take() {
                self.controller.configure(&gains);
            }
        }

        let out = self.interpolator.step(&io.pending);

        let measured = io.sensor.read_position();
        self.shared.set_position(measured);

        if let Some(target) = out.target {
            let command = self.controller.update(target, measured);
            io.actuator.apply(command);
        }

        self.shared.set_state(out.state);
        self.shared.stats.record(out.events);
        if out.events.intersects(TickEvents::DEMAND) {
            self.shared.demand.signal();
        }
        out.events
    }
}
