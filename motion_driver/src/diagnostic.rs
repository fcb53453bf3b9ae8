//! Diagnostic trajectories for bring-up.
//!
//! Posts a permanent hold followed by a four-pass oscillation. The hold is
//! open-ended, so the oscillation supersedes it as soon as it is pending.

use motion_common::trajectory::{LoopCount, SegmentDuration, TrajectoryBuffer, TrajectoryError};
use serde::Serialize;
use tracing::{info, warn};

use crate::control::FeedbackController;
use crate::driver::MotionDriver;
use crate::queue::Timeout;

/// Setpoint held by [`permanent_hold`].
pub const HOLD_SETPOINT: f32 = 15488.0;

/// `{delay 0, loop ∞, [(∞, 15488)]}`
pub fn permanent_hold(buf: &mut TrajectoryBuffer) -> Result<(), TrajectoryError> {
    buf.clear();
    buf.loop_count = LoopCount::Infinite;
    buf.push_segment(SegmentDuration::Forever, HOLD_SETPOINT)
}

/// `{delay 2000, loop 4, [(1000, 1500), (2000, 10000)]}`
pub fn oscillation(buf: &mut TrajectoryBuffer) -> Result<(), TrajectoryError> {
    buf.clear();
    buf.delay = 2000;
    buf.loop_count = LoopCount::times(4);
    buf.push_segment(SegmentDuration::ticks(1000), 1500.0)?;
    buf.push_segment(SegmentDuration::ticks(2000), 10000.0)
}

/// Outcome of [`post_diagnostic_buffers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticReport {
    pub posted: u32,
    pub allocation_failures: u32,
    pub rejected: u32,
}

type Fill = fn(&mut TrajectoryBuffer) -> Result<(), TrajectoryError>;

/// Allocate, fill and enqueue both diagnostic buffers, waiting for queue space.
///
/// A buffer that cannot be allocated is skipped and counted.
pub fn post_diagnostic_buffers<C: FeedbackController>(
    driver: &MotionDriver<C>,
) -> DiagnosticReport {
    let programs: [(&str, Fill); 2] = [
        ("permanent_hold", permanent_hold),
        ("oscillation", oscillation),
    ];
    let mut report = DiagnosticReport::default();

    for (name, fill) in programs {
        let Some(mut buf) = driver.allocate() else {
            warn!(program = name, "no free trajectory buffer, skipping");
            report.allocation_failures += 1;
            continue;
        };
        if let Err(e) = fill(&mut *buf) {
            warn!(program = name, "diagnostic program rejected: {e}");
            report.rejected += 1;
            continue;
        }
        match driver.enqueue(buf, Timeout::Infinite) {
            Ok(()) => report.posted += 1,
            Err(e) => {
                warn!(program = name, "diagnostic program not queued: {e}");
                report.rejected += 1;
            }
        }
    }

    info!(
        posted = report.posted,
        allocation_failures = report.allocation_failures,
        "diagnostic buffers posted"
    );
    report
}
