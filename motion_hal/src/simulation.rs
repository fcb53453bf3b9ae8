//! Simulated actuator plant.
//!
//! A second-order axis driven by the last applied command:
//!
//! ```text
//! a = gain * u - damping * v
//! v += a * dt
//! x += v * dt
//! ```
//!
//! The plant integrates one step per position read, so with one read per
//! tick `dt_s` should match the tick period. [`SimulatedAxis::split`]
//! yields the two hooks the driver binds at start.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use motion_common::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Plant parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimAxisConfig {
    /// Acceleration per unit of command.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Velocity damping coefficient [1/s].
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Integration step [s].
    #[serde(default = "default_dt")]
    pub dt_s: f32,
    /// Starting position.
    #[serde(default)]
    pub initial_position: f32,
}

fn default_gain() -> f32 {
    20_000.0
}
fn default_damping() -> f32 {
    20.0
}
fn default_dt() -> f32 {
    0.001
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            damping: default_damping(),
            dt_s: default_dt(),
            initial_position: 0.0,
        }
    }
}

impl SimAxisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gain.is_finite() || !self.damping.is_finite() || self.damping < 0.0 {
            return Err(ConfigError::ValidationError(
                "simulation.gain must be finite and simulation.damping finite and >= 0"
                    .to_string(),
            ));
        }
        if !self.dt_s.is_finite() || self.dt_s <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "simulation.dt_s must be > 0, got {}",
                self.dt_s
            )));
        }
        if !self.initial_position.is_finite() {
            return Err(ConfigError::ValidationError(
                "simulation.initial_position must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Plant model before it is split into hooks.
#[derive(Debug)]
pub struct SimulatedAxis {
    config: SimAxisConfig,
}

impl SimulatedAxis {
    pub fn new(config: SimAxisConfig) -> Self {
        Self { config }
    }

    /// Produce the sensor and actuator halves sharing one command register.
    pub fn split(self) -> (SimSensor, SimActuator) {
        let command = Arc::new(AtomicU32::new(0f32.to_bits()));
        let sensor = SimSensor {
            config: self.config,
            position: self.config.initial_position,
            velocity: 0.0,
            command: Arc::clone(&command),
        };
        (sensor, SimActuator { command })
    }
}

/// Position half of the plant. Integrates one step per read.
#[derive(Debug)]
pub struct SimSensor {
    config: SimAxisConfig,
    position: f32,
    velocity: f32,
    command: Arc<AtomicU32>,
}

impl SimSensor {
    /// Current velocity without stepping the plant.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    fn step(&mut self) {
        let u = f32::from_bits(self.command.load(Ordering::Relaxed));
        let SimAxisConfig {
            gain, damping, dt_s, ..
        } = self.config;
        let accel = gain * u - damping * self.velocity;
        self.velocity += accel * dt_s;
        self.position += self.velocity * dt_s;
    }
}

impl crate::driver::PositionSensor for SimSensor {
    fn read_position(&mut self) -> f32 {
        self.step();
        self.position
    }
}

/// Command half of the plant.
#[derive(Debug, Clone)]
pub struct SimActuator {
    command: Arc<AtomicU32>,
}

impl SimActuator {
    /// Last applied command.
    pub fn command(&self) -> f32 {
        f32::from_bits(self.command.load(Ordering::Relaxed))
    }
}

impl crate::driver::Actuator for SimActuator {
    fn apply(&mut self, output: f32) {
        self.command.store(output.to_bits(), Ordering::Relaxed);
    }
}
