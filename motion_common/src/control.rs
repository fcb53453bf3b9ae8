//! Feedback controller parameters.
//!
//! Serializable PID coefficients loaded from the `[control]` table and
//! converted into the controller's runtime gains by the driver crate.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// PID coefficients for the position loop.
///
/// A zero gain disables its term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParameters {
    /// Proportional gain.
    #[serde(default)]
    pub kp: f32,
    /// Integral gain (0 = disabled).
    #[serde(default)]
    pub ki: f32,
    /// Derivative gain (0 = disabled).
    #[serde(default)]
    pub kd: f32,
    /// Derivative filter time constant [s] (0 = unfiltered).
    #[serde(default)]
    pub tf: f32,
    /// Anti-windup tracking time constant [s] (0 = disabled).
    #[serde(default)]
    pub tt: f32,
    /// Symmetric output saturation limit.
    #[serde(default = "default_out_max")]
    pub out_max: f32,
}

fn default_out_max() -> f32 {
    1.0
}

impl Default for PidParameters {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            tf: 0.0,
            tt: 0.0,
            out_max: default_out_max(),
        }
    }
}

impl PidParameters {
    /// Reject non-finite or negative coefficients and a non-positive output limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("tf", self.tf),
            ("tt", self.tt),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "control.{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if !self.out_max.is_finite() || self.out_max <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "control.out_max must be finite and > 0, got {}",
                self.out_max
            )));
        }
        Ok(())
    }
}
