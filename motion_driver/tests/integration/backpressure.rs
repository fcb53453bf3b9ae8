//! Pool exhaustion, queue backpressure and many-producer submission.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use motion_common::trajectory::{LoopCount, SegmentDuration};
use motion_driver::{BufferPool, CommandQueue, EnqueueError, SealedTrajectory, Timeout};

use super::{Rig, ticks, wait_until};

fn sealed(pool: &Arc<BufferPool>, setpoint: f32) -> SealedTrajectory {
    let mut buf = pool.allocate().unwrap();
    buf.push_segment(ticks(1), setpoint).unwrap();
    buf.seal().unwrap()
}

#[test]
fn pool_exhaustion_recovers_when_the_tick_releases_a_block() {
    let rig = Rig::new(2, 2);
    rig.submit(0, LoopCount::Infinite, &[(SegmentDuration::Forever, 1.0)]);
    rig.fire(1);
    rig.submit(0, LoopCount::times(1), &[(ticks(5), 2.0)]);

    assert!(rig.driver.allocate().is_none());
    assert_eq!(rig.pool.available(), 0);

    // Supersession releases the hold.
    rig.fire(1);
    assert_eq!(rig.pool.available(), 1);
    let buf = rig.driver.allocate().expect("released block");
    assert!(buf.segments.is_empty());
    assert_eq!(buf.delay, 0);
}

#[test]
fn full_queue_hands_the_buffer_back_for_retry() {
    let pool = BufferPool::new(4).unwrap();
    let queue: Arc<CommandQueue<SealedTrajectory>> = Arc::new(CommandQueue::new(1).unwrap());

    queue.post(sealed(&pool, 1.0), Timeout::Immediate).unwrap();
    let retry = queue
        .post(sealed(&pool, 2.0), Timeout::Immediate)
        .unwrap_err()
        .into_inner();
    assert_eq!(retry.segments[0].setpoint, 2.0);
    assert_eq!(pool.outstanding(), 2);

    // The queued item survives until a driver starts on this queue.
    let rig = Rig::with_resources(Arc::clone(&pool), Arc::clone(&queue));
    assert!(wait_until(|| rig.driver.stats().accepted == 1));

    rig.driver
        .enqueue_sealed(retry, Timeout::After(Duration::from_secs(1)))
        .unwrap();
    assert!(wait_until(|| rig.driver.stats().accepted == 2));
    assert_eq!(rig.driver.stats().displaced, 1);

    rig.fire(1);
    assert_eq!(rig.commands(), [2.0]);
}

#[test]
fn rejected_enqueue_releases_or_returns_the_buffer() {
    let rig = Rig::new(2, 2);

    let empty = rig.driver.allocate().unwrap();
    assert!(matches!(
        rig.driver.enqueue(empty, Timeout::Immediate),
        Err(EnqueueError::Invalid(_))
    ));
    assert_eq!(rig.pool.outstanding(), 0);

    let other = BufferPool::new(1).unwrap();
    let err = rig
        .driver
        .enqueue_sealed(sealed(&other, 1.0), Timeout::Immediate)
        .unwrap_err();
    let foreign = err.into_buffer().expect("foreign buffer returned");
    assert_eq!(other.outstanding(), 1);
    drop(foreign);
    assert_eq!(other.outstanding(), 0);
}

#[test]
fn many_producers_keep_only_the_newest_pending() {
    const PRODUCERS: usize = 8;
    let rig = Rig::new(PRODUCERS + 1, 1);

    thread::scope(|s| {
        for i in 0..PRODUCERS {
            let driver = &rig.driver;
            s.spawn(move || {
                let mut buf = driver.allocate().unwrap();
                buf.push_segment(ticks(1), i as f32).unwrap();
                driver.enqueue(buf, Timeout::Infinite).unwrap();
            });
        }
    });

    assert!(wait_until(|| rig.driver.stats().accepted == PRODUCERS as u64));
    assert_eq!(rig.driver.stats().displaced, PRODUCERS as u64 - 1);
    assert_eq!(rig.pool.outstanding(), 1);
    assert!(rig.driver.has_pending());
}
