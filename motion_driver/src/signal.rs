//! Binary signal with any number of waiters.
//!
//! `signal` sets a flag and unparks every registered waiter. It never blocks
//! and never allocates: the waiter list is only reached through `try_lock`.
//! A waiter that holds the list lock re-checks the flag after releasing it
//! and does the unparking itself, so a `signal` that finds the lock taken
//! is not lost. Signals raised while the flag is already set collapse into
//! one, and each raised signal is consumed by exactly one waiter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct BinarySignal {
    raised: AtomicBool,
    waiters: Mutex<Vec<Thread>>,
    /// Length of `waiters`, readable without the lock.
    parked: AtomicUsize,
}

impl BinarySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Safe from the tick context.
    pub fn signal(&self) {
        if self.raised.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(waiters) = self.waiters.try_lock() {
            waiters.iter().for_each(Thread::unpark);
        }
    }

    /// Consume a raised signal without waiting.
    pub fn try_take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Drop an unconsumed signal.
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    /// Block until raised, then consume it.
    pub fn wait(&self) {
        self.wait_until(None);
    }

    /// Block up to `timeout`. Returns `true` if a signal was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now().checked_add(timeout))
    }

    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        if self.try_take() {
            return true;
        }
        let me = thread::current();
        {
            let mut waiters = self.waiters.lock();
            waiters.push(me.clone());
            self.parked.store(waiters.len(), Ordering::Release);
        }

        let taken = loop {
            if self.try_take() {
                break true;
            }
            match deadline {
                None => thread::park(),
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        break false;
                    }
                    thread::park_timeout(at - now);
                }
            }
        };

        {
            let mut waiters = self.waiters.lock();
            waiters.retain(|t| t.id() != me.id());
            self.parked.store(waiters.len(), Ordering::Release);
        }
        // A `signal` that raced with our unregistering could not reach the
        // list; pass it on to whoever is still waiting.
        if self.is_raised() {
            self.waiters.lock().iter().for_each(Thread::unpark);
        }
        taken
    }

    /// Threads currently blocked in `wait` / `wait_timeout`.
    pub fn waiters(&self) -> usize {
        self.parked.load(Ordering::Acquire)
    }
}
