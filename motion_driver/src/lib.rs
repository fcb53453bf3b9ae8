//! # Motion Driver
//!
//! Per-actuator motion driver. Executes queued trajectory buffers through a
//! fixed-rate feedback loop without allocating after `start`.
//!
//! ## Contexts
//!
//! | Context | Runs | May block |
//! |---------|------|-----------|
//! | Tick | [`tick::TickHandler::tick`] once per timer period | never |
//! | Worker | [`worker`] fetch loop | on the command queue only |
//! | Producer | [`MotionDriver::allocate`] / [`MotionDriver::enqueue`] | on a full queue, if asked to |
//!
//! ## Buffer flow
//!
//! ```text
//! pool ──allocate──▶ producer ──enqueue──▶ queue ──worker──▶ pending ──tick──▶ active
//!   ▲                                                          │                 │
//!   └─────────────────────── release (drop) ◀──────────────────┴─────────────────┘
//! ```
//!
//! A newer pending buffer displaces an older one that the tick has not yet
//! taken. The active buffer is only replaced when it exhausts, or at a
//! boundary when it is open-ended.

pub mod config;
pub mod control;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod interpolator;
pub mod pool;
pub mod queue;
pub mod signal;
pub mod slot;
pub mod tick;
pub mod worker;

pub use control::{FeedbackController, Pid, PidGains};
pub use driver::{MotionBindings, MotionDriver};
pub use error::{EnqueueError, MotionError};
pub use pool::{BufferPool, SealedTrajectory, TrajectoryBuf};
pub use queue::{CommandQueue, Timeout};
pub use tick::{DriverStats, TickEvents};
