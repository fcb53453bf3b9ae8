//! Bounded blocking FIFO between producers and the worker.
//!
//! Storage is a fixed `heapless::Deque` sized for [`QUEUE_CAPACITY_MAX`];
//! the runtime capacity chosen at construction caps how much of it is used.
//! Waits are expressed with [`Timeout`] and rely on two condvars
//! (`not_empty` for the consumer, `not_full` for producers).
//!
//! [`CommandQueue::close`] fails every current and future wait with
//! `Closed` until [`CommandQueue::reopen`]. Queued items are kept.

use std::time::{Duration, Instant};

use heapless::Deque;
use motion_common::consts::QUEUE_CAPACITY_MAX;
use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

/// How long a queue operation may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail at once if the operation cannot proceed.
    Immediate,
    /// Wait up to this long.
    After(Duration),
    /// Wait until the operation proceeds or the queue is closed.
    Infinite,
}

impl Timeout {
    fn deadline(self) -> Deadline {
        match self {
            Self::Immediate => Deadline::Now,
            // Overflowing durations are treated as unbounded.
            Self::After(d) => Instant::now()
                .checked_add(d)
                .map_or(Deadline::Never, Deadline::At),
            Self::Infinite => Deadline::Never,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Self::Immediate
        } else {
            Self::After(d)
        }
    }
}

enum Deadline {
    Now,
    At(Instant),
    Never,
}

impl Deadline {
    /// Block on `cv`. Returns `false` once the deadline has passed.
    fn wait<T>(&self, cv: &Condvar, guard: &mut MutexGuard<'_, T>) -> bool {
        match self {
            Self::Now => false,
            Self::At(at) => !cv.wait_until(guard, *at).timed_out(),
            Self::Never => {
                cv.wait(guard);
                true
            }
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue capacity {requested} out of range [1, {max}]")]
    InvalidCapacity { requested: usize, max: usize },
}

/// Failed `post`; the item is handed back.
#[derive(Debug, Error)]
pub enum PostError<T> {
    #[error("queue full")]
    Timeout(T),
    #[error("queue closed")]
    Closed(T),
}

impl<T> PostError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(item) | Self::Closed(item) => item,
        }
    }
}

/// Failed `fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("queue empty")]
    Timeout,
    #[error("queue closed")]
    Closed,
}

// ─── Queue ──────────────────────────────────────────────────────────

struct Inner<T> {
    items: Deque<T, QUEUE_CAPACITY_MAX>,
    closed: bool,
}

/// Multi-producer FIFO with blocking and timed waits.
pub struct CommandQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> CommandQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 || capacity > QUEUE_CAPACITY_MAX {
            return Err(QueueError::InvalidCapacity {
                requested: capacity,
                max: QUEUE_CAPACITY_MAX,
            });
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                items: Deque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    /// Append `item`, waiting for space per `timeout`.
    pub fn post(&self, item: T, timeout: Timeout) -> Result<(), PostError<T>> {
        let deadline = timeout.deadline();
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(PostError::Closed(item));
            }
            if inner.items.len() < self.capacity {
                if let Err(item) = inner.items.push_back(item) {
                    return Err(PostError::Timeout(item));
                }
                drop(inner);
                self.not_empty.notify_one();
                return Ok(());
            }
            if !deadline.wait(&self.not_full, &mut inner)
                && !inner.closed
                && inner.items.len() >= self.capacity
            {
                return Err(PostError::Timeout(item));
            }
        }
    }

    /// Remove the oldest item, waiting for one per `timeout`.
    pub fn fetch(&self, timeout: Timeout) -> Result<T, FetchError> {
        let deadline = timeout.deadline();
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(FetchError::Closed);
            }
            if let Some(item) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Ok(item);
            }
            if !deadline.wait(&self.not_empty, &mut inner)
                && !inner.closed
                && inner.items.is_empty()
            {
                return Err(FetchError::Timeout);
            }
        }
    }

    /// Fail all waiters with `Closed` and reject new operations.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn reopen(&self) {
        self.inner.lock().closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> core::fmt::Debug for CommandQueue<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CommandQueue")
            .field("len", &inner.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &inner.closed)
            .finish()
    }
}
