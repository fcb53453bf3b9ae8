//! Workspace-wide constants for the motion driver.
//!
//! Single source of truth for capacity limits and defaults.

use static_assertions::const_assert;

/// Maximum number of segments in one trajectory buffer.
pub const SEGMENTS_MAX: usize = 32;

/// Maximum number of trajectory buffers in one pool (one bit per block in a `u64`).
pub const POOL_CAPACITY_MAX: usize = 64;

/// Maximum depth of the command queue.
pub const QUEUE_CAPACITY_MAX: usize = 32;

/// Default tick period in microseconds (1 kHz = 1000 µs).
pub const TICK_PERIOD_US_DEFAULT: u64 = 1000;

/// Smallest accepted tick period in microseconds.
pub const TICK_PERIOD_US_MIN: u64 = 50;

/// Largest accepted tick period in microseconds.
pub const TICK_PERIOD_US_MAX: u64 = 100_000;

/// Default pool capacity: active + pending + two in flight.
pub const POOL_CAPACITY_DEFAULT: usize = 4;

/// Default command queue depth.
pub const QUEUE_CAPACITY_DEFAULT: usize = 4;

/// Default worker thread name.
pub const WORKER_NAME_DEFAULT: &str = "motion-worker";

/// Default worker thread stack size in bytes.
pub const WORKER_STACK_SIZE_DEFAULT: usize = 64 * 1024;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/motion/driver.toml";

const_assert!(POOL_CAPACITY_MAX <= u64::BITS as usize);
const_assert!(POOL_CAPACITY_DEFAULT >= 2 && POOL_CAPACITY_DEFAULT <= POOL_CAPACITY_MAX);
const_assert!(QUEUE_CAPACITY_DEFAULT <= QUEUE_CAPACITY_MAX);
const_assert!(TICK_PERIOD_US_MIN <= TICK_PERIOD_US_DEFAULT && TICK_PERIOD_US_DEFAULT <= TICK_PERIOD_US_MAX);
