//! # Motion HAL
//!
//! Hardware boundary of the motion driver. The driver never touches a
//! peripheral directly: it reads positions through a [`PositionSensor`],
//! writes actuation commands through an [`Actuator`], and is paced by a
//! [`TickTimer`] standing in for the periodic hardware interrupt.
//!
//! ## Backends
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ThreadTimer`] | Drift-free periodic host thread (optionally SCHED_FIFO with `rt`) |
//! | [`ManualTimer`] | Caller-driven ticks for deterministic tests and benches |
//! | [`SimulatedAxis`] | Second-order actuator plant split into sensor/actuator hooks |

pub mod driver;
pub mod simulation;
pub mod timer;

pub use driver::{Actuator, HalError, PositionSensor, TickFn, TickTimer};
pub use simulation::{SimActuator, SimAxisConfig, SimSensor, SimulatedAxis};
pub use timer::{ManualTimer, ThreadTimer};
