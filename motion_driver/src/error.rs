//! Driver lifecycle and submission errors.

use std::io;
use std::time::Duration;

use motion_common::trajectory::TrajectoryError;
use motion_hal::HalError;
use thiserror::Error;

use crate::pool::SealedTrajectory;

/// Errors from `start`, `stop` and `set_coefficients`.
#[derive(Debug, Error)]
pub enum MotionError {
    /// `start` on a driver that is already running.
    #[error("motion driver already started")]
    AlreadyStarted,

    /// Operation requires a started driver.
    #[error("motion driver not started")]
    NotStarted,

    /// Zero tick period, or one above `TICK_PERIOD_US_MAX`.
    #[error("tick period {0:?} out of range")]
    InvalidTickPeriod(Duration),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] io::Error),

    /// The worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanicked,

    /// Tick timer failure.
    #[error("tick timer: {0}")]
    Timer(#[from] HalError),
}

/// Errors from [`crate::MotionDriver::enqueue`].
///
/// Variants that carry the buffer hand it back to the caller, who may retry
/// or drop it (dropping releases it to the pool).
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The driver is not started.
    #[error("motion driver not started")]
    NotStarted,

    /// The buffer failed validation.
    #[error("invalid trajectory: {0}")]
    Invalid(#[from] TrajectoryError),

    /// The buffer was allocated from a pool other than the bound one.
    #[error("buffer belongs to a different pool")]
    ForeignPool(SealedTrajectory),

    /// The queue stayed full for the whole wait.
    #[error("command queue full")]
    Timeout(SealedTrajectory),

    /// The queue was closed while waiting.
    #[error("command queue closed")]
    Closed(SealedTrajectory),
}

impl EnqueueError {
    /// Recover the buffer when the error carries one.
    pub fn into_buffer(self) -> Option<SealedTrajectory> {
        match self {
            Self::ForeignPool(b) | Self::Timeout(b) | Self::Closed(b) => Some(b),
            Self::NotStarted | Self::Invalid(_) => None,
        }
    }
}
