//! Immutable intervals.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

use super::{TimeSource, TimeValue};
use crate::error::TimeError;

/// An interval between two [`TimeValue`]s.
///
/// `end` never precedes `start`; an inverted interval is rejected at
/// construction rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSegment {
    start: TimeValue,
    end: TimeValue,
}

impl TimeSegment {
    pub fn create(start: TimeValue, end: TimeValue) -> Result<Self, TimeError> {
        if end.is_less_than(&start) {
            return Err(TimeError::InvalidEndTime {
                start: start.relative(),
                end: end.relative(),
            });
        }
        Ok(Self { start, end })
    }

    /// Build from two raw relative timestamps, as found on a performance entry.
    ///
    /// Each bound is checked on its own before any time value is built, so a
    /// malformed number reports [`TimeError::InvalidTimeSegment`] and only a
    /// well-formed but inverted pair reports [`TimeError::InvalidEndTime`].
    pub fn from_raw_timing(source: &dyn TimeSource, start: f64, end: f64) -> Result<Self, TimeError> {
        check_bound("start", start)?;
        check_bound("end", end)?;
        if end < start {
            return Err(TimeError::InvalidEndTime { start, end });
        }
        let start = TimeValue::from_relative(source, start)?;
        let end = TimeValue::from_relative(source, end)?;
        Self::create(start, end)
    }

    pub fn start(&self) -> TimeValue {
        self.start
    }

    pub fn end(&self) -> TimeValue {
        self.end
    }

    /// Length of the interval in milliseconds.
    pub fn duration(&self) -> f64 {
        self.end.relative() - self.start.relative()
    }

    pub fn is_empty(&self) -> bool {
        self.duration() == 0.0
    }
}

fn check_bound(bound: &'static str, value: f64) -> Result<(), TimeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TimeError::InvalidTimeSegment { bound, value })
    }
}

impl fmt::Display for TimeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({}ms)", self.start, self.end, self.duration())
    }
}

impl Serialize for TimeSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TimeSegment", 3)?;
        state.serialize_field("duration", &self.duration())?;
        state.serialize_field("start", &self.start.absolute())?;
        state.serialize_field("end", &self.end.absolute())?;
        state.end()
    }
}
