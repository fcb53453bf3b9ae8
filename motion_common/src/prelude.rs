//! Prelude module for common re-exports.
//!
//! ```rust
//! use motion_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, MotionConfig, SharedConfig, WorkerConfig};

// ─── Control ────────────────────────────────────────────────────────
pub use crate::control::PidParameters;

// ─── Limits ─────────────────────────────────────────────────────────
pub use crate::consts::{POOL_CAPACITY_MAX, QUEUE_CAPACITY_MAX, SEGMENTS_MAX};

// ─── Trajectory & State ─────────────────────────────────────────────
pub use crate::state::MotionState;
pub use crate::trajectory::{
    LoopCount, Segment, SegmentDuration, TrajectoryBuffer, TrajectoryError, TrajectoryProgram,
};
