//! Per-tick trajectory stepping.
//!
//! [`Interpolator::step`] is the pure part of the tick: promotion, delay
//! countdown, target emission and segment/loop advancement. It touches no
//! hardware; the tick handler feeds its target to the controller.
//!
//! ## Step order
//!
//! 1. Promote the pending buffer if the active slot is empty, or if the
//!    active buffer is open-ended and sits at a boundary.
//! 2. Idle without an active buffer.
//! 3. Count down the start delay, holding the previous target.
//! 4. Emit the current setpoint, then advance. On exhaustion release the
//!    buffer and promote the next pending one, if any.
//!
//! A buffer promoted from idle at tick `k` is exhausted at the end of tick
//! `k + delay + loops × Σduration − 1`.

use bitflags::bitflags;
use motion_common::state::MotionState;

use crate::pool::SealedTrajectory;
use crate::slot::PendingSlot;

bitflags! {
    /// What happened during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TickEvents: u8 {
        /// A pending buffer became active.
        const PROMOTED   = 1 << 0;
        /// An open-ended active buffer was replaced at a boundary.
        const SUPERSEDED = 1 << 1;
        /// The active buffer ran out of loops.
        const EXHAUSTED  = 1 << 2;
        /// The active buffer is still in its start delay.
        const DELAYING   = 1 << 3;
        /// No active buffer; no target.
        const IDLE       = 1 << 4;
    }
}

impl TickEvents {
    /// Events after which the producer side has room for more work.
    pub const DEMAND: Self = Self::PROMOTED
        .union(Self::SUPERSEDED)
        .union(Self::EXHAUSTED);
}

/// Result of one [`Interpolator::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// Target for the controller, `None` when nothing drives the axis.
    pub target: Option<f32>,
    /// `Stopped` or `Ready`.
    pub state: MotionState,
    pub events: TickEvents,
}

/// Active-buffer cursor.
#[derive(Debug)]
pub struct Interpolator {
    active: Option<SealedTrajectory>,
    remaining_delay: u32,
    /// `None` for an infinite loop count.
    remaining_loop: Option<u32>,
    /// `None` while parked on a `Forever` segment.
    remaining_segment: Option<u32>,
    segment_index: usize,
    /// Set once a `Forever` segment has been emitted.
    parked: bool,
    /// Set when an infinite-loop buffer wraps; cleared on the next emission.
    at_cycle_start: bool,
    last_target: Option<f32>,
    state: MotionState,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpolator {
    pub const fn new() -> Self {
        Self {
            active: None,
            remaining_delay: 0,
            remaining_loop: None,
            remaining_segment: None,
            segment_index: 0,
            parked: false,
            at_cycle_start: false,
            last_target: None,
            state: MotionState::Stopped,
        }
    }

    /// Release the active buffer and forget the last target.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn state(&self) -> MotionState {
        self.state
    }

    #[inline]
    pub fn active(&self) -> Option<&SealedTrajectory> {
        self.active.as_ref()
    }

    #[inline]
    pub fn last_target(&self) -> Option<f32> {
        self.last_target
    }

    #[inline]
    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    #[inline]
    pub fn remaining_delay(&self) -> u32 {
        self.remaining_delay
    }

    /// Passes left, `None` for an infinite loop count.
    #[inline]
    pub fn remaining_loop(&self) -> Option<u32> {
        self.remaining_loop
    }

    /// Advance one tick.
    pub fn step(&mut self, pending: &PendingSlot) -> TickOutput {
        let mut events = TickEvents::empty();

        if self.active.is_none() || self.at_boundary() {
            if let Some(next) = pending.take() {
                if self.active.is_some() {
                    events |= TickEvents::SUPERSEDED;
                }
                self.load(next);
                events |= TickEvents::PROMOTED;
            }
        }

        let Some(buffer) = self.active.as_ref() else {
            self.state = MotionState::Stopped;
            return TickOutput {
                target: None,
                state: self.state,
                events: events | TickEvents::IDLE,
            };
        };

        if self.remaining_delay > 0 {
            self.remaining_delay -= 1;
            return TickOutput {
                target: self.last_target,
                state: self.state,
                events: events | TickEvents::DELAYING,
            };
        }

        let segment_count = buffer.segments.len();
        let Some(segment) = buffer.segments.get(self.segment_index).copied() else {
            events |= self.exhaust(pending);
            return TickOutput {
                target: self.last_target,
                state: self.state,
                events,
            };
        };

        let target = segment.setpoint;
        self.last_target = Some(target);
        self.state = MotionState::Ready;
        self.at_cycle_start = false;

        match self.remaining_segment {
            Some(left) if left > 1 => self.remaining_segment = Some(left - 1),
            Some(_) => events |= self.advance_segment(segment_count, pending),
            None => self.parked = true,
        }

        TickOutput {
            target: Some(target),
            state: self.state,
            events,
        }
    }

    /// Open-ended buffer parked on `Forever`, or an infinite loop that just wrapped.
    fn at_boundary(&self) -> bool {
        self.active.is_some()
            && (self.parked || (self.remaining_loop.is_none() && self.at_cycle_start))
    }

    fn load(&mut self, buffer: SealedTrajectory) {
        self.remaining_delay = buffer.delay;
        self.remaining_loop = buffer.loop_count.get();
        self.segment_index = 0;
        self.remaining_segment = buffer.segments.first().and_then(|s| s.duration.get());
        self.parked = false;
        self.at_cycle_start = false;
        // Replacing drops the previous buffer, releasing its block.
        self.active = Some(buffer);
    }

    fn advance_segment(&mut self, segment_count: usize, pending: &PendingSlot) -> TickEvents {
        self.segment_index += 1;
        if self.segment_index >= segment_count {
            self.segment_index = 0;
            match self.remaining_loop {
                None => self.at_cycle_start = true,
                Some(loops) if loops > 1 => self.remaining_loop = Some(loops - 1),
                Some(_) => return self.exhaust(pending),
            }
        }
        self.remaining_segment = self
            .active
            .as_ref()
            .and_then(|b| b.segments.get(self.segment_index))
            .and_then(|s| s.duration.get());
        TickEvents::empty()
    }

    fn exhaust(&mut self, pending: &PendingSlot) -> TickEvents {
        self.active = None;
        self.remaining_segment = None;
        self.remaining_loop = None;
        self.segment_index = 0;
        self.parked = false;
        self.at_cycle_start = false;

        match pending.take() {
            Some(next) => {
                self.load(next);
                TickEvents::EXHAUSTED | TickEvents::PROMOTED
            }
            None => {
                self.state = MotionState::Stopped;
                TickEvents::EXHAUSTED
            }
        }
    }
}
