//! Daemon configuration file.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "actuator-01"
//!
//! [motion]
//! tick_period_us = 1000
//! pool_capacity = 4
//!
//! [motion.control]
//! kp = 0.002
//! out_max = 1.0
//!
//! [simulation]
//! gain = 20000.0
//! damping = 20.0
//!
//! [[program]]
//! loop_count = "infinite"
//! segments = [{ duration = "forever", setpoint = 15488.0 }]
//! ```
//!
//! Without `[[program]]` entries the daemon posts the diagnostic buffers.

use std::path::Path;

use motion_common::config::{ConfigError, ConfigLoader, MotionConfig, SharedConfig};
use motion_common::trajectory::{TrajectoryBuffer, TrajectoryProgram};
use motion_hal::SimAxisConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub simulation: SimAxisConfig,
    /// Trajectories posted in order after start.
    #[serde(default)]
    pub program: Vec<TrajectoryProgram>,
}

impl DaemonConfig {
    /// Load and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.motion.validate()?;
        self.simulation.validate()?;

        let mut scratch = TrajectoryBuffer::new();
        for (i, program) in self.program.iter().enumerate() {
            program
                .write_into(&mut scratch)
                .map_err(|e| ConfigError::ValidationError(format!("program[{i}]: {e}")))?;
        }
        if self.program.len() > self.motion.pool_capacity {
            tracing::warn!(
                programs = self.program.len(),
                pool_capacity = self.motion.pool_capacity,
                "more programs than pool blocks; later ones wait for releases"
            );
        }
        Ok(())
    }
}
