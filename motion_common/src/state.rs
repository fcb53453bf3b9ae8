//! Motion driver state.
//!
//! `#[repr(u8)]` so the tick context can publish it through an `AtomicU8`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle and run state of one motion driver.
///
/// `Uninit` is left only through `start` and re-entered only through `stop`.
/// `Stopped` and `Ready` alternate inside the tick handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum MotionState {
    /// Not started: no timer, no worker, no bound resources.
    #[default]
    Uninit = 0,
    /// Started, no trajectory is producing targets.
    Stopped = 1,
    /// A trajectory is active and its delay has elapsed.
    Ready = 2,
}

impl MotionState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninit),
            1 => Some(Self::Stopped),
            2 => Some(Self::Ready),
            _ => None,
        }
    }

    /// True once `start` has completed and until `stop`.
    #[inline]
    pub const fn is_started(self) -> bool {
        !matches!(self, Self::Uninit)
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninit => "uninit",
            Self::Stopped => "stopped",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}
