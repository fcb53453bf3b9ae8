//! Shared rig for the integration tests.

pub mod backpressure;
pub mod daemon_config;
pub mod lifecycle;
pub mod properties;
pub mod supersede;
pub mod trajectory_timing;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use motion_common::config::WorkerConfig;
use motion_common::trajectory::{LoopCount, SegmentDuration};
use motion_driver::{
    BufferPool, CommandQueue, FeedbackController, MotionBindings, MotionDriver, SealedTrajectory,
    Timeout,
};
use motion_hal::ManualTimer;
use parking_lot::Mutex;

/// Controller that forwards its target as the actuation command, so the
/// actuator log is the exact target sequence.
pub struct Echo;

impl FeedbackController for Echo {
    type Gains = ();
    fn configure(&mut self, _: &()) {}
    fn update(&mut self, target: f32, _measured: f32) -> f32 {
        target
    }
    fn reset(&mut self) {}
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Started driver with an echo controller and a caller-stepped timer.
pub struct Rig {
    pub driver: MotionDriver<Echo>,
    pub pool: Arc<BufferPool>,
    pub queue: Arc<CommandQueue<SealedTrajectory>>,
    pub timer: ManualTimer,
    pub commands: Arc<Mutex<Vec<f32>>>,
}

impl Rig {
    pub fn new(pool_capacity: usize, queue_capacity: usize) -> Self {
        let pool = BufferPool::new(pool_capacity).unwrap();
        let queue = Arc::new(CommandQueue::new(queue_capacity).unwrap());
        Self::with_resources(pool, queue)
    }

    pub fn with_resources(
        pool: Arc<BufferPool>,
        queue: Arc<CommandQueue<SealedTrajectory>>,
    ) -> Self {
        let timer = ManualTimer::new();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commands);

        let driver = MotionDriver::new(Echo);
        driver
            .start(MotionBindings {
                pool: Arc::clone(&pool),
                queue: Arc::clone(&queue),
                worker: WorkerConfig::default(),
                timer: Box::new(timer.clone()),
                tick_period: Duration::from_millis(1),
                gains: (),
                sensor: Box::new(|| 0.0f32),
                actuator: Box::new(move |u: f32| sink.lock().push(u)),
            })
            .unwrap();

        Self {
            driver,
            pool,
            queue,
            timer,
            commands,
        }
    }

    /// Build, enqueue and wait until the worker has placed the buffer in the pending slot.
    pub fn submit(&self, delay: u32, loops: LoopCount, segments: &[(SegmentDuration, f32)]) {
        let accepted = self.driver.stats().accepted;
        let mut buf = self.driver.allocate().unwrap();
        buf.delay = delay;
        buf.loop_count = loops;
        for &(duration, setpoint) in segments {
            buf.push_segment(duration, setpoint).unwrap();
        }
        self.driver.enqueue(buf, Timeout::Infinite).unwrap();
        assert!(wait_until(|| self.driver.stats().accepted > accepted));
    }

    pub fn fire(&self, n: u64) {
        assert_eq!(self.timer.fire_n(n), n);
    }

    pub fn commands(&self) -> Vec<f32> {
        self.commands.lock().clone()
    }
}

pub fn ticks(n: u32) -> SegmentDuration {
    SegmentDuration::ticks(n)
}
