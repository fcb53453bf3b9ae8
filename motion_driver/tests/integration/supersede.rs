//! Pending-slot displacement and supersession of open-ended buffers.

use motion_common::state::MotionState;
use motion_common::trajectory::{LoopCount, SegmentDuration};

use super::{Rig, ticks};

#[test]
fn newer_pending_displaces_older_without_touching_active() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::times(1), &[(ticks(10), 1.0)]);
    rig.fire(1);

    rig.submit(0, LoopCount::times(1), &[(ticks(1), 2.0)]);
    rig.submit(0, LoopCount::times(1), &[(ticks(1), 3.0)]);

    let stats = rig.driver.stats();
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.displaced, 1);
    // Active plus the surviving pending buffer.
    assert_eq!(rig.pool.outstanding(), 2);

    // The active buffer finishes undisturbed, then the newest one runs.
    rig.fire(10);
    let commands = rig.commands();
    assert_eq!(commands.len(), 11);
    assert!(commands[..10].iter().all(|&t| t == 1.0));
    assert_eq!(commands[10], 3.0);
    assert!(!commands.contains(&2.0));
    assert_eq!(rig.driver.stats().supersessions, 0);
}

#[test]
fn forever_segment_is_superseded_on_the_next_tick() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::Infinite, &[(SegmentDuration::Forever, 5.0)]);
    rig.fire(3);

    rig.submit(0, LoopCount::times(1), &[(ticks(2), 6.0)]);
    assert!(rig.driver.has_pending());
    rig.fire(1);

    assert!(!rig.driver.has_pending());
    assert_eq!(rig.commands(), [5.0, 5.0, 5.0, 6.0]);
    let stats = rig.driver.stats();
    assert_eq!(stats.supersessions, 1);
    assert_eq!(stats.promotions, 2);
    // The hold's block went back when it was replaced.
    assert_eq!(rig.pool.outstanding(), 1);
}

#[test]
fn infinite_loop_is_superseded_at_cycle_start() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::Infinite, &[(ticks(2), 1.0), (ticks(2), 2.0)]);
    rig.fire(1);

    rig.submit(0, LoopCount::times(1), &[(ticks(1), 9.0)]);
    rig.fire(4);

    // The cycle in progress completes before the new buffer takes over.
    assert_eq!(rig.commands(), [1.0, 1.0, 2.0, 2.0, 9.0]);
    assert_eq!(rig.driver.stats().supersessions, 1);
}

#[test]
fn no_supersession_during_a_delay() {
    let rig = Rig::new(4, 4);
    rig.submit(3, LoopCount::Infinite, &[(SegmentDuration::Forever, 1.0)]);
    rig.fire(1);

    rig.submit(0, LoopCount::times(1), &[(ticks(1), 2.0)]);
    rig.fire(2);
    assert!(rig.driver.has_pending());
    assert!(rig.commands().is_empty());

    // First emission of the hold, then supersession on the following tick.
    rig.fire(2);
    assert_eq!(rig.commands(), [1.0, 2.0]);
    assert_eq!(rig.driver.stats().supersessions, 1);
    assert_eq!(rig.driver.state(), MotionState::Stopped);
}

#[test]
fn demand_raised_on_promotion() {
    let rig = Rig::new(4, 4);
    rig.submit(0, LoopCount::Infinite, &[(SegmentDuration::Forever, 1.0)]);
    assert!(!rig.driver.wait_for_demand(std::time::Duration::ZERO));

    rig.fire(1);
    assert!(rig.driver.wait_for_demand(std::time::Duration::from_millis(100)));

    // Holding raises nothing further.
    rig.fire(10);
    assert!(!rig.driver.wait_for_demand(std::time::Duration::ZERO));
}
