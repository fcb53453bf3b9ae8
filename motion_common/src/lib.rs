//! Motion Common Library
//!
//! Shared types for the single-actuator motion driver workspace: the
//! trajectory buffer data model, the driver state enum, controller
//! parameters and configuration loading.
//!
//! # Module Structure
//!
//! - [`trajectory`] - Trajectory buffers, segments and loop counts
//! - [`state`] - Motion driver state
//! - [`control`] - Feedback controller parameters
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Capacity limits and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use motion_common::prelude::*;
//!
//! let mut buffer = TrajectoryBuffer::new();
//! buffer.push_segment(SegmentDuration::ticks(1000), 1500.0).unwrap();
//! assert_eq!(buffer.total_ticks(), Some(1000));
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod prelude;
pub mod state;
pub mod trajectory;
