//! Configuration loading traits and types.
//!
//! Every binary in the workspace loads TOML through [`ConfigLoader`] and
//! embeds [`SharedConfig`] for logging. [`MotionConfig`] carries the
//! per-actuator driver settings.
//!
//! # Usage
//!
//! ```rust,no_run
//! use motion_common::config::{ConfigError, ConfigLoader, MotionConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MotionConfig::load(Path::new("driver.toml"))?;
//!     config.validate()?;
//!     println!("tick period: {:?}", config.tick_period());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    POOL_CAPACITY_DEFAULT, POOL_CAPACITY_MAX, QUEUE_CAPACITY_DEFAULT, QUEUE_CAPACITY_MAX,
    TICK_PERIOD_US_DEFAULT, TICK_PERIOD_US_MAX, TICK_PERIOD_US_MIN, WORKER_NAME_DEFAULT,
    WORKER_STACK_SIZE_DEFAULT,
};
use crate::control::PidParameters;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read config file {}: {reason}", .path.display())]
    ReadError { path: PathBuf, reason: String },

    /// Invalid TOML or a value of the wrong shape.
    #[error("config parse error: {0}")]
    ParseError(String),

    /// Well-formed but out of range.
    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Minimum level emitted by the binaries, written in lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared across binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "actuator-02"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, used as a tracing field.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "motion-driver".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Motion Driver Config ───────────────────────────────────────────

/// Worker task parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Thread name.
    #[serde(default = "default_worker_name")]
    pub name: String,
    /// Thread stack size in bytes.
    #[serde(default = "default_worker_stack")]
    pub stack_size: usize,
}

fn default_worker_name() -> String {
    WORKER_NAME_DEFAULT.to_string()
}
fn default_worker_stack() -> usize {
    WORKER_STACK_SIZE_DEFAULT
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: default_worker_name(),
            stack_size: default_worker_stack(),
        }
    }
}

/// Per-actuator motion driver configuration.
///
/// Sizes are fixed at startup; nothing here is resized while the driver runs.
///
/// # TOML Example
///
/// ```toml
/// tick_period_us = 1000
/// pool_capacity = 4
/// queue_capacity = 4
///
/// [worker]
/// name = "motion-worker-2"
///
/// [control]
/// kp = 0.002
/// ki = 0.0005
/// out_max = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Tick period in microseconds.
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u64,

    /// Number of trajectory buffers in the pool.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Command queue depth.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Worker task parameters.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Initial controller coefficients.
    #[serde(default)]
    pub control: PidParameters,
}

fn default_tick_period_us() -> u64 {
    TICK_PERIOD_US_DEFAULT
}
fn default_pool_capacity() -> usize {
    POOL_CAPACITY_DEFAULT
}
fn default_queue_capacity() -> usize {
    QUEUE_CAPACITY_DEFAULT
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_period_us: default_tick_period_us(),
            pool_capacity: default_pool_capacity(),
            queue_capacity: default_queue_capacity(),
            worker: WorkerConfig::default(),
            control: PidParameters::default(),
        }
    }
}

impl MotionConfig {
    /// Tick period as a `Duration`.
    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }

    /// Check every numeric bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(TICK_PERIOD_US_MIN..=TICK_PERIOD_US_MAX).contains(&self.tick_period_us) {
            return Err(ConfigError::ValidationError(format!(
                "tick_period_us {} out of range [{TICK_PERIOD_US_MIN}, {TICK_PERIOD_US_MAX}]",
                self.tick_period_us
            )));
        }
        if !(2..=POOL_CAPACITY_MAX).contains(&self.pool_capacity) {
            return Err(ConfigError::ValidationError(format!(
                "pool_capacity {} out of range [2, {POOL_CAPACITY_MAX}]",
                self.pool_capacity
            )));
        }
        if !(1..=QUEUE_CAPACITY_MAX).contains(&self.queue_capacity) {
            return Err(ConfigError::ValidationError(format!(
                "queue_capacity {} out of range [1, {QUEUE_CAPACITY_MAX}]",
                self.queue_capacity
            )));
        }
        if self.worker.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "worker.name cannot be empty".to_string(),
            ));
        }
        if self.worker.stack_size < 16 * 1024 {
            return Err(ConfigError::ValidationError(format!(
                "worker.stack_size {} below 16 KiB",
                self.worker.stack_size
            )));
        }
        self.control.validate()
    }
}

// ─── Loader ─────────────────────────────────────────────────────────

/// TOML loading for any deserializable config type.
///
/// Loading never validates; call the type's `validate` afterwards.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
