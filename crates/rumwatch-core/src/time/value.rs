//! Immutable instants.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::TimeSource;
use crate::error::TimeError;

/// A point in time, held relative to the host time origin and as an
/// absolute wall-clock value (both in milliseconds).
///
/// `relative` is always finite and non-negative. Comparisons use the
/// relative component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeValue {
    absolute: f64,
    relative: f64,
}

/// Something that can shift a [`TimeValue`]: a raw millisecond count or
/// another time value (its relative component).
pub trait TimeOffset {
    fn offset_ms(&self) -> f64;
}

impl TimeOffset for f64 {
    fn offset_ms(&self) -> f64 {
        *self
    }
}

impl TimeOffset for TimeValue {
    fn offset_ms(&self) -> f64 {
        self.relative
    }
}

impl TimeOffset for &TimeValue {
    fn offset_ms(&self) -> f64 {
        self.relative
    }
}

fn validate(value: f64) -> Result<f64, TimeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TimeError::InvalidTimeValue { value })
    }
}

impl TimeValue {
    /// Build from milliseconds since the time origin.
    pub fn from_relative(source: &dyn TimeSource, relative: f64) -> Result<Self, TimeError> {
        let relative = validate(relative)?;
        let origin = source
            .time_origin()
            .ok_or(TimeError::UnsupportedTimeSource)?;
        Ok(Self {
            absolute: origin + relative,
            relative,
        })
    }

    /// Build from an absolute wall-clock timestamp.
    ///
    /// A timestamp before the origin keeps its absolute value but clamps the
    /// relative component to zero.
    pub fn from_absolute(source: &dyn TimeSource, absolute: f64) -> Result<Self, TimeError> {
        let absolute = validate(absolute)?;
        let origin = source
            .time_origin()
            .ok_or(TimeError::UnsupportedTimeSource)?;
        Ok(Self {
            absolute,
            relative: (absolute - origin).max(0.0),
        })
    }

    /// The current instant according to `source`.
    pub fn now(source: &dyn TimeSource) -> Result<Self, TimeError> {
        let now = source.now().ok_or(TimeError::UnsupportedTimeSource)?;
        Self::from_relative(source, now)
    }

    pub fn relative(&self) -> f64 {
        self.relative
    }

    pub fn absolute(&self) -> f64 {
        self.absolute
    }

    pub fn is_greater_than(&self, other: &TimeValue) -> bool {
        self.relative > other.relative
    }

    pub fn is_greater_than_or_equal(&self, other: &TimeValue) -> bool {
        self.relative >= other.relative
    }

    pub fn is_less_than(&self, other: &TimeValue) -> bool {
        self.relative < other.relative
    }

    pub fn is_less_than_or_equal(&self, other: &TimeValue) -> bool {
        self.relative <= other.relative
    }

    /// Shift forward. The result is re-validated.
    pub fn add<O: TimeOffset>(&self, offset: O) -> Result<Self, TimeError> {
        self.shifted(offset.offset_ms())
    }

    /// Shift backward. Fails if the result would precede the origin.
    pub fn subtract<O: TimeOffset>(&self, offset: O) -> Result<Self, TimeError> {
        self.shifted(-offset.offset_ms())
    }

    fn shifted(&self, delta: f64) -> Result<Self, TimeError> {
        let relative = validate(self.relative + delta)?;
        let absolute = validate(self.absolute + delta)?;
        Ok(Self { absolute, relative })
    }
}

impl PartialOrd for TimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.relative.partial_cmp(&other.relative)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute)
    }
}
