//! The shipped daemon configuration parses, validates and fits the pool.

use motion_common::config::ConfigLoader;
use motion_common::trajectory::{LoopCount, TrajectoryBuffer};
use motion_driver::config::DaemonConfig;

const SHIPPED: &str = include_str!("../../../config/driver.toml");

#[test]
fn shipped_config_is_valid() {
    let config = DaemonConfig::from_toml(SHIPPED).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.service_name, "actuator-01");
    assert!(config.motion.control.kp > 0.0);
    assert_eq!(config.program.len(), 3);
    assert!(config.program.len() <= config.motion.pool_capacity);
}

#[test]
fn shipped_programs_have_expected_lengths() {
    let config = DaemonConfig::from_toml(SHIPPED).unwrap();
    let mut scratch = TrajectoryBuffer::new();

    let totals: Vec<_> = config
        .program
        .iter()
        .map(|p| {
            p.write_into(&mut scratch).unwrap();
            scratch.total_ticks()
        })
        .collect();
    assert_eq!(totals, [Some(3000), Some(14_000), None]);
    assert_eq!(config.program[2].loop_count, LoopCount::Infinite);
}
