//! Trajectory buffer data model.
//!
//! A trajectory buffer is one motion program: an optional start delay
//! followed by an ordered list of `(duration, setpoint)` segments, repeated
//! `loop_count` times. All durations are counted in driver ticks.
//!
//! Zero-length segments and zero loop counts are unrepresentable: both use
//! `NonZeroU32`, with `Forever` / `Infinite` as the open-ended variants.

use core::num::NonZeroU32;

use heapless::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::SEGMENTS_MAX;

/// Trajectory validation and construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrajectoryError {
    /// A buffer must contain at least one segment.
    #[error("trajectory has no segments")]
    Empty,

    /// More segments than a buffer can hold.
    #[error("trajectory exceeds {capacity} segments")]
    TooManySegments {
        /// Fixed per-buffer segment capacity.
        capacity: usize,
    },

    /// A zero count was supplied where a positive count is required.
    #[error("{field} must be a positive tick count or the infinite sentinel")]
    ZeroCount {
        /// Offending field name.
        field: &'static str,
    },
}

// ─── Counts ─────────────────────────────────────────────────────────

/// How many times the segment list is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CountRepr", into = "CountRepr")]
pub enum LoopCount {
    /// Play the segment list this many times, then retire the buffer.
    Times(NonZeroU32),
    /// Repeat until superseded or stopped.
    Infinite,
}

impl LoopCount {
    /// Finite loop count; zero is rounded up to a single pass.
    pub const fn times(n: u32) -> Self {
        match NonZeroU32::new(n) {
            Some(n) => Self::Times(n),
            None => Self::Times(NonZeroU32::MIN),
        }
    }

    /// Remaining passes, `None` when infinite.
    #[inline]
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Times(n) => Some(n.get()),
            Self::Infinite => None,
        }
    }

    #[inline]
    pub const fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl Default for LoopCount {
    fn default() -> Self {
        Self::Times(NonZeroU32::MIN)
    }
}

/// How long a segment's setpoint is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CountRepr", into = "CountRepr")]
pub enum SegmentDuration {
    /// Hold for this many ticks.
    Ticks(NonZeroU32),
    /// Hold indefinitely; segment and loop advancement stop here.
    Forever,
}

impl SegmentDuration {
    /// Finite duration; a segment is emitted for at least one tick.
    pub const fn ticks(n: u32) -> Self {
        match NonZeroU32::new(n) {
            Some(n) => Self::Ticks(n),
            None => Self::Ticks(NonZeroU32::MIN),
        }
    }

    /// Tick count, `None` for `Forever`.
    #[inline]
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Ticks(n) => Some(n.get()),
            Self::Forever => None,
        }
    }
}

/// Serialized form shared by both count types: a positive integer or a keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Count(u32),
    Keyword(String),
}

const INFINITE_KEYWORDS: [&str; 2] = ["infinite", "forever"];

impl TryFrom<CountRepr> for LoopCount {
    type Error = String;

    fn try_from(repr: CountRepr) -> Result<Self, Self::Error> {
        match repr {
            CountRepr::Count(n) => NonZeroU32::new(n)
                .map(Self::Times)
                .ok_or_else(|| TrajectoryError::ZeroCount { field: "loop_count" }.to_string()),
            CountRepr::Keyword(k) if INFINITE_KEYWORDS.contains(&k.as_str()) => Ok(Self::Infinite),
            CountRepr::Keyword(k) => Err(format!("unknown loop count keyword '{k}'")),
        }
    }
}

impl From<LoopCount> for CountRepr {
    fn from(count: LoopCount) -> Self {
        match count {
            LoopCount::Times(n) => Self::Count(n.get()),
            LoopCount::Infinite => Self::Keyword("infinite".to_string()),
        }
    }
}

impl TryFrom<CountRepr> for SegmentDuration {
    type Error = String;

    fn try_from(repr: CountRepr) -> Result<Self, Self::Error> {
        match repr {
            CountRepr::Count(n) => NonZeroU32::new(n)
                .map(Self::Ticks)
                .ok_or_else(|| TrajectoryError::ZeroCount { field: "duration" }.to_string()),
            CountRepr::Keyword(k) if INFINITE_KEYWORDS.contains(&k.as_str()) => Ok(Self::Forever),
            CountRepr::Keyword(k) => Err(format!("unknown duration keyword '{k}'")),
        }
    }
}

impl From<SegmentDuration> for CountRepr {
    fn from(duration: SegmentDuration) -> Self {
        match duration {
            SegmentDuration::Ticks(n) => Self::Count(n.get()),
            SegmentDuration::Forever => Self::Keyword("forever".to_string()),
        }
    }
}

// ─── Segment & Buffer ───────────────────────────────────────────────

/// One `(duration, setpoint)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// How long the setpoint is held.
    pub duration: SegmentDuration,
    /// Target position for the duration of the segment.
    pub setpoint: f32,
}

/// One motion program, stored in a fixed-capacity pool block.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryBuffer {
    /// Ticks to hold the previous target before the first segment.
    pub delay: u32,
    /// Number of passes over `segments`.
    pub loop_count: LoopCount,
    /// Ordered segments, 1..=`SEGMENTS_MAX` once validated.
    pub segments: Vec<Segment, SEGMENTS_MAX>,
}

impl TrajectoryBuffer {
    /// Empty buffer: no delay, a single pass, no segments.
    pub const fn new() -> Self {
        Self {
            delay: 0,
            loop_count: LoopCount::Times(NonZeroU32::MIN),
            segments: Vec::new(),
        }
    }

    /// Reset to the state returned by [`TrajectoryBuffer::new`].
    pub fn clear(&mut self) {
        self.delay = 0;
        self.loop_count = LoopCount::default();
        self.segments.clear();
    }

    /// Append a segment.
    pub fn push_segment(
        &mut self,
        duration: SegmentDuration,
        setpoint: f32,
    ) -> Result<(), TrajectoryError> {
        self.segments
            .push(Segment { duration, setpoint })
            .map_err(|_| TrajectoryError::TooManySegments {
                capacity: SEGMENTS_MAX,
            })
    }

    /// Check the invariants required before the buffer may be queued.
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.segments.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        Ok(())
    }

    /// Ticks for one pass over the segments, `None` if any segment is `Forever`.
    pub fn cycle_ticks(&self) -> Option<u64> {
        self.segments
            .iter()
            .try_fold(0u64, |acc, s| s.duration.get().map(|d| acc + u64::from(d)))
    }

    /// Ticks during which the buffer emits targets, `None` when open-ended.
    pub fn active_ticks(&self) -> Option<u64> {
        let loops = self.loop_count.get()?;
        self.cycle_ticks().map(|cycle| cycle * u64::from(loops))
    }

    /// Delay plus active ticks, `None` when open-ended.
    pub fn total_ticks(&self) -> Option<u64> {
        self.active_ticks().map(|active| active + u64::from(self.delay))
    }

    /// True if the buffer never exhausts on its own.
    pub fn is_open_ended(&self) -> bool {
        self.active_ticks().is_none()
    }
}

impl Default for TrajectoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Program (config form) ──────────────────────────────────────────

/// Owned, deserializable description of one trajectory buffer.
///
/// # TOML Example
///
/// ```toml
/// [[program]]
/// delay = 2000
/// loop_count = 4
/// segments = [
///     { duration = 1000, setpoint = 1500.0 },
///     { duration = 2000, setpoint = 10000.0 },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryProgram {
    /// Start delay in ticks.
    #[serde(default)]
    pub delay: u32,
    /// Number of passes.
    #[serde(default)]
    pub loop_count: LoopCount,
    /// Segment list.
    pub segments: std::vec::Vec<Segment>,
}

impl TrajectoryProgram {
    /// Overwrite `buffer` with this program and validate the result.
    pub fn write_into(&self, buffer: &mut TrajectoryBuffer) -> Result<(), TrajectoryError> {
        buffer.clear();
        buffer.delay = self.delay;
        buffer.loop_count = self.loop_count;
        for segment in &self.segments {
            buffer.push_segment(segment.duration, segment.setpoint)?;
        }
        buffer.validate()
    }
}
