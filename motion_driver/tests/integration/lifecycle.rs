//! Start/stop cycles on a real tick thread driving the simulated axis.

use std::sync::Arc;
use std::time::Duration;

use motion_common::config::WorkerConfig;
use motion_common::control::PidParameters;
use motion_common::state::MotionState;
use motion_common::trajectory::{LoopCount, SegmentDuration};
use motion_driver::diagnostic::post_diagnostic_buffers;
use motion_driver::{
    BufferPool, CommandQueue, MotionBindings, MotionDriver, MotionError, Pid, PidGains,
    SealedTrajectory, Timeout,
};
use motion_hal::{SimAxisConfig, SimulatedAxis, ThreadTimer};

use super::{Rig, wait_until};

const PERIOD: Duration = Duration::from_millis(1);

fn gains() -> PidGains {
    PidGains::from(PidParameters {
        kp: 0.002,
        ..PidParameters::default()
    })
}

fn start_on_axis(
    driver: &MotionDriver,
    pool: &Arc<BufferPool>,
    queue: &Arc<CommandQueue<SealedTrajectory>>,
) -> Result<(), MotionError> {
    let (sensor, actuator) = SimulatedAxis::new(SimAxisConfig::default()).split();
    driver.start(MotionBindings {
        pool: Arc::clone(pool),
        queue: Arc::clone(queue),
        worker: WorkerConfig::default(),
        timer: Box::new(ThreadTimer::new("it-tick")),
        tick_period: PERIOD,
        gains: gains(),
        sensor: Box::new(sensor),
        actuator: Box::new(actuator),
    })
}

fn hold(driver: &MotionDriver, setpoint: f32) {
    let mut buf = driver.allocate().unwrap();
    buf.loop_count = LoopCount::Infinite;
    buf.push_segment(SegmentDuration::Forever, setpoint).unwrap();
    driver.enqueue(buf, Timeout::Infinite).unwrap();
}

#[test]
fn hold_moves_the_axis_towards_its_setpoint() {
    let pool = BufferPool::new(4).unwrap();
    let queue = Arc::new(CommandQueue::new(4).unwrap());
    let driver = MotionDriver::new(Pid::new(PERIOD.as_secs_f32()));

    start_on_axis(&driver, &pool, &queue).unwrap();
    assert_eq!(driver.state(), MotionState::Stopped);

    hold(&driver, 500.0);
    assert!(wait_until(|| driver.state() == MotionState::Ready));
    assert!(wait_until(|| driver.position() > 100.0));
    assert!(driver.position() < 600.0);

    driver.stop().unwrap();
    assert_eq!(driver.state(), MotionState::Uninit);
    assert_eq!(pool.outstanding(), 0);
    assert!(driver.stats().ticks > 0);
}

#[test]
fn restart_reuses_pool_and_queue() {
    let pool = BufferPool::new(4).unwrap();
    let queue = Arc::new(CommandQueue::new(4).unwrap());
    let driver = MotionDriver::new(Pid::new(PERIOD.as_secs_f32()));

    for round in 0..3 {
        start_on_axis(&driver, &pool, &queue).unwrap();
        assert!(matches!(
            start_on_axis(&driver, &pool, &queue),
            Err(MotionError::AlreadyStarted)
        ));

        hold(&driver, 100.0 * (round + 1) as f32);
        assert!(wait_until(|| driver.state() == MotionState::Ready));
        driver.stop().unwrap();

        assert_eq!(pool.outstanding(), 0, "round {round}");
        assert!(queue.is_empty());
        assert!(!queue.is_closed());
    }
    assert!(matches!(driver.stop(), Err(MotionError::NotStarted)));
}

#[test]
fn coefficients_can_change_while_running() {
    let pool = BufferPool::new(4).unwrap();
    let queue = Arc::new(CommandQueue::new(4).unwrap());
    let driver = MotionDriver::new(Pid::new(PERIOD.as_secs_f32()));

    assert!(matches!(
        driver.set_coefficients(gains()),
        Err(MotionError::NotStarted)
    ));

    start_on_axis(&driver, &pool, &queue).unwrap();
    hold(&driver, 300.0);
    assert!(wait_until(|| driver.position() > 50.0));

    // A zero-gain controller commands nothing, so the axis coasts to rest.
    driver
        .set_coefficients(PidGains::from(PidParameters::default()))
        .unwrap();
    std::thread::sleep(Duration::from_millis(500));
    let settled = driver.position();
    std::thread::sleep(Duration::from_millis(100));
    assert!((driver.position() - settled).abs() < 1.0);

    driver.stop().unwrap();
}

#[test]
fn diagnostic_buffers_run_on_the_axis() {
    let pool = BufferPool::new(4).unwrap();
    let queue = Arc::new(CommandQueue::new(4).unwrap());
    let driver = MotionDriver::new(Pid::new(PERIOD.as_secs_f32()));
    start_on_axis(&driver, &pool, &queue).unwrap();

    let report = post_diagnostic_buffers(&driver);
    assert_eq!(report.posted, 2);
    assert_eq!(report.allocation_failures, 0);

    // The hold is either superseded by the oscillation or displaced before
    // its first tick; both end with the oscillation active.
    assert!(wait_until(|| {
        let stats = driver.stats();
        stats.accepted == 2 && stats.promotions + stats.displaced == 2
    }));
    assert!(!driver.has_pending());
    assert_eq!(pool.outstanding(), 1);

    driver.stop().unwrap();
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn stop_keeps_queued_items_for_the_next_start() {
    let rig = Rig::new(4, 4);
    rig.driver.stop().unwrap();

    let mut buf = rig.pool.allocate().unwrap();
    buf.push_segment(SegmentDuration::ticks(1), 4.0).unwrap();
    rig.queue
        .post(buf.seal().unwrap(), Timeout::Immediate)
        .unwrap();
    assert_eq!(rig.queue.len(), 1);

    let restarted = Rig::with_resources(Arc::clone(&rig.pool), Arc::clone(&rig.queue));
    assert!(wait_until(|| restarted.driver.has_pending()));
    assert!(rig.queue.is_empty());
    restarted.fire(1);
    assert_eq!(restarted.commands(), [4.0]);
}
