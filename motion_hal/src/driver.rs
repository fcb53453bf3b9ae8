//! Hardware hook traits and error types.
//!
//! This module defines:
//! - `PositionSensor` - raw position sample source
//! - `Actuator` - actuation command sink
//! - `TickTimer` - periodic tick source driving the control step
//! - `HalError` - error types for HAL operations

use std::time::Duration;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// `arm` called on a timer that is already running.
    #[error("Timer already armed")]
    TimerBusy,

    /// Tick period of zero.
    #[error("Invalid tick period: {0:?}")]
    InvalidPeriod(Duration),

    /// The timer thread could not be spawned.
    #[error("Timer spawn failed: {0}")]
    SpawnFailed(String),

    /// The timer thread panicked while running the tick function.
    #[error("Timer thread panicked")]
    TickPanicked,

    /// RT scheduling setup failed.
    #[error("RT setup failed: {0}")]
    RtSetup(String),
}

/// Tick function installed by [`TickTimer::arm`].
pub type TickFn = Box<dyn FnMut() + Send + 'static>;

/// Source of raw position samples.
///
/// Called once per tick from the tick context. Implementations must not
/// block and must not allocate.
pub trait PositionSensor: Send {
    /// Sample the current measured position.
    fn read_position(&mut self) -> f32;
}

/// Sink for controller output.
///
/// Called once per tick from the tick context while a target exists.
/// Implementations must not block and must not allocate.
pub trait Actuator: Send {
    /// Apply one actuation command.
    fn apply(&mut self, output: f32);
}

impl<F> PositionSensor for F
where
    F: FnMut() -> f32 + Send,
{
    #[inline]
    fn read_position(&mut self) -> f32 {
        self()
    }
}

impl<F> Actuator for F
where
    F: FnMut(f32) + Send,
{
    #[inline]
    fn apply(&mut self, output: f32) {
        self(output)
    }
}

/// Periodic tick source.
///
/// # Lifecycle
///
/// 1. `arm()` - install the tick function and start firing every `period`
/// 2. tick function runs once per period, never concurrently with itself
/// 3. `disarm()` - stop firing; returns only after an in-flight tick has
///    finished, and drops the tick function
///
/// A disarmed timer may be armed again.
pub trait TickTimer: Send {
    /// Start firing `tick` every `period`.
    ///
    /// # Errors
    /// `HalError::TimerBusy` if already armed, `HalError::InvalidPeriod` for a
    /// zero period or one whose deadline cannot be represented, backend-specific
    /// errors otherwise.
    fn arm(&mut self, period: Duration, tick: TickFn) -> Result<(), HalError>;

    /// Stop firing and drop the tick function. No-op when not armed.
    fn disarm(&mut self) -> Result<(), HalError>;

    /// True between a successful `arm` and the next `disarm`.
    fn is_armed(&self) -> bool;
}
