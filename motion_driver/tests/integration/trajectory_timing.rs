//! Exact tick accounting of delays, segments and loops through the full driver.

use motion_common::state::MotionState;
use motion_common::trajectory::{LoopCount, SegmentDuration};
use motion_driver::diagnostic::HOLD_SETPOINT;

use super::{Rig, ticks};

#[test]
fn oscillation_runs_exactly_its_total_ticks() {
    let rig = Rig::new(4, 4);
    rig.submit(
        2000,
        LoopCount::times(4),
        &[(ticks(1000), 1500.0), (ticks(2000), 10000.0)],
    );

    // Delay with no previous target: nothing reaches the actuator.
    rig.fire(2000);
    assert_eq!(rig.driver.state(), MotionState::Stopped);
    assert!(rig.commands().is_empty());
    assert_eq!(rig.driver.stats().promotions, 1);

    rig.fire(1);
    assert_eq!(rig.driver.state(), MotionState::Ready);
    assert_eq!(rig.commands(), [1500.0]);

    rig.fire(11_999);
    let stats = rig.driver.stats();
    assert_eq!(stats.exhaustions, 1);
    assert_eq!(rig.driver.state(), MotionState::Stopped);

    let commands = rig.commands();
    assert_eq!(commands.len(), 12_000);
    for pass in commands.chunks(3000) {
        assert!(pass[..1000].iter().all(|&t| t == 1500.0));
        assert!(pass[1000..].iter().all(|&t| t == 10000.0));
    }

    // Exhausted and nothing pending: the block is back in the pool.
    assert_eq!(rig.pool.outstanding(), 0);

    rig.fire(10);
    assert_eq!(rig.commands().len(), 12_000);
    assert_eq!(rig.driver.stats().ticks, 14_010);
}

#[test]
fn permanent_hold_never_exhausts() {
    let rig = Rig::new(4, 4);
    rig.submit(
        0,
        LoopCount::Infinite,
        &[(SegmentDuration::Forever, HOLD_SETPOINT)],
    );

    rig.fire(5000);
    let commands = rig.commands();
    assert_eq!(commands.len(), 5000);
    assert!(commands.iter().all(|&t| t == HOLD_SETPOINT));

    let stats = rig.driver.stats();
    assert_eq!(stats.exhaustions, 0);
    assert_eq!(stats.promotions, 1);
    assert_eq!(rig.driver.state(), MotionState::Ready);
    assert_eq!(rig.pool.outstanding(), 1);
}

#[test]
fn back_to_back_finite_buffers_chain_without_a_gap() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::times(1), &[(ticks(3), 1.0)]);
    rig.fire(1);
    rig.submit(0, LoopCount::times(2), &[(ticks(1), 2.0)]);

    rig.fire(4);
    assert_eq!(rig.commands(), [1.0, 1.0, 1.0, 2.0, 2.0]);

    let stats = rig.driver.stats();
    assert_eq!(stats.promotions, 2);
    assert_eq!(stats.exhaustions, 2);
    assert_eq!(stats.supersessions, 0);
    assert_eq!(rig.driver.state(), MotionState::Stopped);
}

#[test]
fn delay_holds_the_previous_target() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::times(1), &[(ticks(2), 7.0)]);
    rig.fire(1);
    rig.submit(3, LoopCount::times(1), &[(ticks(1), 8.0)]);

    // Last tick of the first buffer promotes the second, whose delay then
    // repeats 7.0 before 8.0 is emitted.
    rig.fire(5);
    assert_eq!(rig.commands(), [7.0, 7.0, 7.0, 7.0, 7.0, 8.0]);
}
