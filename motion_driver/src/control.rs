//! Feedback controller seam.
//!
//! The tick handler owns exactly one controller per driver and calls
//! [`FeedbackController::update`] once per tick while a target exists.
//! Gains supplied through `set_coefficients` reach the controller via
//! [`FeedbackController::configure`] at the start of the next tick.

pub mod pid;

use core::fmt::Debug;

pub use pid::{Pid, PidGains, PidState};

/// Position controller driven from the tick context.
///
/// Implementations must not block, allocate or panic in `update`.
pub trait FeedbackController: Send + 'static {
    /// Coefficient set accepted by [`FeedbackController::configure`].
    type Gains: Copy + Send + Debug + 'static;

    /// Replace the coefficients. Internal state is kept.
    fn configure(&mut self, gains: &Self::Gains);

    /// One control step. Returns the actuation command.
    fn update(&mut self, target: f32, measured: f32) -> f32;

    /// Clear integrator and filter state.
    fn reset(&mut self);
}
