//! Tick timer backends.
//!
//! ## ThreadTimer
//! A dedicated host thread paced on absolute deadlines (`next += period`)
//! for drift-free ticking. Missed deadlines count as overruns; the timer
//! then resynchronizes instead of bursting to catch up.
//!
//! With the `rt` feature the thread locks all memory pages and switches to
//! `SCHED_FIFO` at the configured priority before the first tick.
//!
//! ## ManualTimer
//! Runs the tick function on the caller's thread via [`ManualTimer::fire`].
//! Clones share the same armed tick function, so a test can hand one clone
//! to the driver and keep another to step time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::driver::{HalError, TickFn, TickTimer};

// ─── Thread Timer ───────────────────────────────────────────────────

/// Periodic host thread standing in for a hardware timer interrupt.
pub struct ThreadTimer {
    name: String,
    rt_priority: Option<i32>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// Create a disarmed timer whose thread will carry `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rt_priority: None,
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Request SCHED_FIFO at `priority` for the tick thread (`rt` feature only).
    pub fn with_rt_priority(mut self, priority: i32) -> Self {
        self.rt_priority = Some(priority);
        self
    }

    /// Ticks executed since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks whose execution exceeded the period.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl TickTimer for ThreadTimer {
    fn arm(&mut self, period: Duration, mut tick: TickFn) -> Result<(), HalError> {
        if self.handle.is_some() {
            return Err(HalError::TimerBusy);
        }
        if period.is_zero() {
            return Err(HalError::InvalidPeriod(period));
        }
        let first = Instant::now()
            .checked_add(period)
            .ok_or(HalError::InvalidPeriod(period))?;

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let ticks = Arc::clone(&self.ticks);
        let overruns = Arc::clone(&self.overruns);
        let rt_priority = self.rt_priority;

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                if let Some(priority) = rt_priority {
                    if let Err(e) = rt_setup(priority) {
                        warn!("tick thread continues without RT scheduling: {e}");
                    }
                }
                run_periodic(first, period, &mut tick, &running, &ticks, &overruns);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                HalError::SpawnFailed(e.to_string())
            })?;

        debug!(name = %self.name, ?period, "tick timer armed");
        self.handle = Some(handle);
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), HalError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);
        handle.thread().unpark();
        handle.join().map_err(|_| HalError::TickPanicked)?;
        debug!(
            name = %self.name,
            ticks = self.ticks(),
            overruns = self.overruns(),
            "tick timer disarmed"
        );
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let _ = self.disarm();
    }
}

fn run_periodic(
    first: Instant,
    period: Duration,
    tick: &mut TickFn,
    running: &AtomicBool,
    ticks: &AtomicU64,
    overruns: &AtomicU64,
) {
    let mut next = first;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next {
            // Unpark from `disarm` ends the wait early.
            thread::park_timeout(next - now);
            continue;
        }

        let started = Instant::now();
        tick();
        ticks.fetch_add(1, Ordering::Relaxed);
        let elapsed = started.elapsed();

        if elapsed > period {
            let n = overruns.fetch_add(1, Ordering::Relaxed) + 1;
            if n.is_power_of_two() {
                warn!(?elapsed, ?period, overruns = n, "tick overran its period");
            }
        }

        let now = Instant::now();
        let Some(after) = next.checked_add(period) else {
            warn!(?period, "tick deadline overflowed, timer stopping");
            break;
        };
        next = if after < now {
            match now.checked_add(period) {
                Some(resync) => resync,
                None => {
                    warn!(?period, "tick deadline overflowed, timer stopping");
                    break;
                }
            }
        } else {
            after
        };
    }
}

/// Lock memory and switch the calling thread to SCHED_FIFO.
#[cfg(feature = "rt")]
fn rt_setup(priority: i32) -> Result<(), HalError> {
    use nix::sys::mman::{MlockallFlags, mlockall};

    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| HalError::RtSetup(format!("mlockall failed: {e}")))?;

    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param; pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(HalError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_setup(_priority: i32) -> Result<(), HalError> {
    Ok(()) // No-op without the `rt` feature
}

// ─── Manual Timer ───────────────────────────────────────────────────

#[derive(Default)]
struct ManualState {
    tick: Option<TickFn>,
    period: Option<Duration>,
    fired: u64,
}

/// Caller-stepped tick source.
#[derive(Clone, Default)]
pub struct ManualTimer {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick. Returns `false` when not armed.
    pub fn fire(&self) -> bool {
        let mut state = self.inner.lock();
        let Some(tick) = state.tick.as_mut() else {
            return false;
        };
        tick();
        state.fired += 1;
        true
    }

    /// Run up to `n` ticks; returns how many ran.
    pub fn fire_n(&self, n: u64) -> u64 {
        let mut state = self.inner.lock();
        let Some(tick) = state.tick.as_mut() else {
            return 0;
        };
        for _ in 0..n {
            tick();
        }
        state.fired += n;
        n
    }

    /// Period passed to the last `arm`, if armed.
    pub fn period(&self) -> Option<Duration> {
        self.inner.lock().period
    }

    /// Total ticks fired across all arm cycles.
    pub fn fired(&self) -> u64 {
        self.inner.lock().fired
    }
}

impl TickTimer for ManualTimer {
    fn arm(&mut self, period: Duration, tick: TickFn) -> Result<(), HalError> {
        if period.is_zero() {
            return Err(HalError::InvalidPeriod(period));
        }
        let mut state = self.inner.lock();
        if state.tick.is_some() {
            return Err(HalError::TimerBusy);
        }
        state.tick = Some(tick);
        state.period = Some(period);
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        state.tick = None;
        state.period = None;
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.inner.lock().tick.is_some()
    }
}
