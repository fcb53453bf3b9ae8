//! # Motion Driver Daemon
//!
//! Runs one motion driver against a simulated axis:
//! - loads a [`DaemonConfig`] TOML (`--config`, else the default path if
//!   present, else built-in defaults),
//! - starts the driver on a drift-free tick thread,
//! - plays the configured `[[program]]` list in order, or the diagnostic
//!   buffers when none is configured,
//! - logs position periodically and stops on `--run-ms` or Ctrl-C.

use clap::Parser;
use motion_common::consts::DEFAULT_CONFIG_PATH;
use motion_common::config::ConfigLoader;
use motion_common::trajectory::TrajectoryProgram;
use motion_driver::config::DaemonConfig;
use motion_driver::diagnostic::{DiagnosticReport, post_diagnostic_buffers};
use motion_driver::{
    BufferPool, CommandQueue, DriverStats, MotionBindings, MotionDriver, Pid, PidGains, Timeout,
};
use motion_hal::{SimulatedAxis, ThreadTimer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Single-actuator motion driver on a simulated axis
#[derive(Parser, Debug)]
#[command(name = "motion_driver")]
#[command(version)]
#[command(about = "Runs queued motion trajectories through a fixed-rate control loop")]
struct Args {
    /// Path to the daemon configuration TOML.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many milliseconds (default: run until Ctrl-C).
    #[arg(long, value_name = "MS")]
    run_ms: Option<u64>,

    /// Position report interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    report_ms: u64,

    /// SCHED_FIFO priority for the tick thread (needs the `rt` feature).
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and the final summary in JSON format.
    #[arg(long)]
    json: bool,
}

/// Final report printed on shutdown.
#[derive(Debug, Serialize)]
struct Summary {
    service: String,
    position: f32,
    stats: DriverStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<DiagnosticReport>,
}

/// Run window shared by the posting and reporting phases.
struct Session {
    running: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Session {
    fn active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.deadline.is_none_or(|d| Instant::now() < d)
    }
}

fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, &config);

    info!(
        service = %config.shared.service_name,
        "Motion driver v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Motion driver shutdown complete");
}

fn load_config(path: Option<&Path>) -> Result<DaemonConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => DaemonConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            DaemonConfig::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => DaemonConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    let motion = &config.motion;
    info!(
        "Config OK: tick_period={}µs, pool={}, queue={}, programs={}",
        motion.tick_period_us,
        motion.pool_capacity,
        motion.queue_capacity,
        config.program.len(),
    );

    let pool = BufferPool::new(motion.pool_capacity)?;
    let queue = Arc::new(CommandQueue::new(motion.queue_capacity)?);
    let (sensor, actuator) = SimulatedAxis::new(config.simulation).split();

    let mut timer = ThreadTimer::new(format!("{}-tick", config.shared.service_name));
    if let Some(priority) = args.rt_priority {
        timer = timer.with_rt_priority(priority);
    }

    let driver = MotionDriver::new(Pid::new(motion.tick_period().as_secs_f32()));
    driver.start(MotionBindings {
        pool,
        queue,
        worker: motion.worker.clone(),
        timer: Box::new(timer),
        tick_period: motion.tick_period(),
        gains: PidGains::from(motion.control),
        sensor: Box::new(sensor),
        actuator: Box::new(actuator),
    })?;

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let session = Session {
        running,
        deadline: args
            .run_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms)),
    };

    let diagnostic = if config.program.is_empty() {
        Some(post_diagnostic_buffers(&driver))
    } else {
        play_programs(&driver, &config.program, &session);
        None
    };

    let report_every = Duration::from_millis(args.report_ms.max(1));
    let mut last_report = Instant::now();
    while session.active() {
        if driver.wait_for_demand(Duration::from_millis(50)) {
            debug!(stats = ?driver.stats(), "tick demand");
        }
        if last_report.elapsed() >= report_every {
            info!(position = driver.position(), state = %driver.state(), "axis");
            last_report = Instant::now();
        }
    }

    driver.stop()?;

    let summary = Summary {
        service: config.shared.service_name.clone(),
        position: driver.position(),
        stats: driver.stats(),
        diagnostic,
    };
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        info!(
            position = summary.position,
            ticks = summary.stats.ticks,
            promotions = summary.stats.promotions,
            supersessions = summary.stats.supersessions,
            exhaustions = summary.stats.exhaustions,
            displaced = summary.stats.displaced,
            "final stats"
        );
    }
    Ok(())
}

/// Post each program once its predecessor has left the pending slot, so a
/// finite program is never displaced before it runs.
fn play_programs(driver: &MotionDriver, programs: &[TrajectoryProgram], session: &Session) {
    let poll = Duration::from_millis(50);

    for (i, program) in programs.iter().enumerate() {
        let mut buf = loop {
            if !session.active() {
                return;
            }
            match driver.allocate() {
                Some(buf) => break buf,
                None => {
                    driver.wait_for_demand(poll);
                }
            }
        };
        if let Err(e) = program.write_into(&mut buf) {
            warn!(program = i, "program rejected: {e}");
            continue;
        }

        let accepted = driver.stats().accepted;
        if let Err(e) = driver.enqueue(buf, Timeout::Infinite) {
            warn!(program = i, "program not queued: {e}");
            continue;
        }
        info!(program = i, total_ticks = ?program_ticks(program), "program queued");

        while session.active() && (driver.stats().accepted == accepted || driver.has_pending()) {
            driver.wait_for_demand(poll);
        }
    }
}

fn program_ticks(program: &TrajectoryProgram) -> Option<u64> {
    let mut scratch = motion_common::trajectory::TrajectoryBuffer::new();
    program.write_into(&mut scratch).ok()?;
    scratch.total_ticks()
}

/// Setup tracing subscriber based on CLI arguments and `[shared]`.
fn setup_tracing(args: &Args, config: &DaemonConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(config.shared.log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
