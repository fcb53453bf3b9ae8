//! Randomized timing properties.

use std::sync::Arc;

use motion_common::state::MotionState;
use motion_common::trajectory::{LoopCount, SegmentDuration};
use motion_driver::interpolator::{Interpolator, TickEvents};
use motion_driver::slot::PendingSlot;
use motion_driver::BufferPool;
use proptest::prelude::*;

use super::Rig;

fn durations() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..20, 1..6)
}

fn expected_ticks(delay: u32, loops: u32, durations: &[u32]) -> u64 {
    let cycle: u64 = durations.iter().map(|&d| u64::from(d)).sum();
    u64::from(delay) + u64::from(loops) * cycle
}

proptest! {
    #[test]
    fn finite_buffer_exhausts_after_delay_plus_loops_times_cycle(
        delay in 0u32..50,
        loops in 1u32..5,
        durations in durations(),
    ) {
        let pool = BufferPool::new(2).unwrap();
        let pending = PendingSlot::new(Arc::clone(&pool));
        let mut interp = Interpolator::new();

        let mut buf = pool.allocate().unwrap();
        buf.delay = delay;
        buf.loop_count = LoopCount::times(loops);
        for (i, &d) in durations.iter().enumerate() {
            buf.push_segment(SegmentDuration::ticks(d), i as f32).unwrap();
        }
        pending.replace(buf.seal().unwrap()).unwrap();

        let expected = expected_ticks(delay, loops, &durations);
        let mut emitted = 0u64;
        for tick in 1..=expected {
            let out = interp.step(&pending);
            if out.target.is_some() {
                emitted += 1;
            }
            prop_assert_eq!(out.events.contains(TickEvents::EXHAUSTED), tick == expected);
        }

        prop_assert_eq!(emitted, expected - u64::from(delay));
        prop_assert_eq!(interp.state(), MotionState::Stopped);
        prop_assert!(interp.active().is_none());
        prop_assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn segment_order_is_preserved_every_pass(
        loops in 1u32..4,
        durations in durations(),
    ) {
        let pool = BufferPool::new(2).unwrap();
        let pending = PendingSlot::new(Arc::clone(&pool));
        let mut interp = Interpolator::new();

        let mut buf = pool.allocate().unwrap();
        buf.loop_count = LoopCount::times(loops);
        for (i, &d) in durations.iter().enumerate() {
            buf.push_segment(SegmentDuration::ticks(d), i as f32).unwrap();
        }
        pending.replace(buf.seal().unwrap()).unwrap();

        let pass: Vec<f32> = durations
            .iter()
            .enumerate()
            .flat_map(|(i, &d)| std::iter::repeat_n(i as f32, d as usize))
            .collect();
        let total = pass.len() * loops as usize;
        let targets: Vec<f32> = (0..total).filter_map(|_| interp.step(&pending).target).collect();

        prop_assert_eq!(targets.len(), total);
        for chunk in targets.chunks(pass.len()) {
            prop_assert_eq!(chunk, pass.as_slice());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn driver_stops_exactly_on_the_last_tick(
        delay in 0u32..30,
        loops in 1u32..4,
        durations in durations(),
    ) {
        let rig = Rig::new(2, 2);
        let segments: Vec<_> = durations
            .iter()
            .map(|&d| (SegmentDuration::ticks(d), d as f32))
            .collect();
        rig.submit(delay, LoopCount::times(loops), &segments);

        let expected = expected_ticks(delay, loops, &durations);
        rig.fire(expected - 1);
        prop_assert_eq!(rig.driver.stats().exhaustions, 0);
        if expected - 1 > u64::from(delay) {
            prop_assert_eq!(rig.driver.state(), MotionState::Ready);
        }

        rig.fire(1);
        prop_assert_eq!(rig.driver.stats().exhaustions, 1);
        prop_assert_eq!(rig.driver.state(), MotionState::Stopped);
        prop_assert_eq!(rig.commands().len() as u64, expected - u64::from(delay));
    }
}
