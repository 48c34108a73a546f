//! Core error types for rumwatch-core.
//!
//! Errors are split by how they surface:
//! - [`TimeError`] and [`ReportError`] are returned synchronously by
//!   value-object and report constructors.
//! - [`MetricError`] travels through the subscriber error channel of a
//!   [`MetricLifecycle`](crate::observe::MetricLifecycle).
//! - [`ConfigError`] comes from loading or validating [`RumConfig`](crate::RumConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by report handlers and measurement sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for rumwatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Time model errors
    #[error("Time error: {0}")]
    Time(#[from] TimeError),

    /// Report construction errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Metric lifecycle errors
    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Value-object invariant violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    /// A timestamp was negative, NaN or infinite
    #[error("Invalid time value: {value} (must be finite and non-negative)")]
    InvalidTimeValue { value: f64 },

    /// A raw segment bound was negative, NaN or infinite
    #[error("Invalid time segment bound '{bound}': {value}")]
    InvalidTimeSegment { bound: &'static str, value: f64 },

    /// Segment end precedes its start
    #[error("Invalid end time: end ({end}) is before start ({start})")]
    InvalidEndTime { start: f64, end: f64 },

    /// The host has no usable time origin
    #[error("Time source is unavailable: no time origin")]
    UnsupportedTimeSource,
}

/// Errors raised while building a report from measured fields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// A measured number was negative, NaN or infinite
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: f64 },

    /// A raw entry lacks a field the metric needs
    #[error("Missing field '{0}' on raw entry")]
    MissingField(&'static str),

    /// Rating thresholds for a vital are out of order or not finite
    #[error("Invalid thresholds for {metric}: {message}")]
    InvalidThresholds { metric: &'static str, message: String },

    /// A timestamp on the report was invalid
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Errors delivered through a lifecycle's error channel.
#[derive(Error, Debug)]
pub enum MetricError {
    /// The host cannot observe this entry type
    #[error("Metric '{metric}' is not supported (entry type '{entry_type}')")]
    UnsupportedMetric { metric: String, entry_type: String },

    /// The host has no time origin, so reports cannot be stamped
    #[error("Metric '{metric}' cannot start: time source is unavailable")]
    UnsupportedTimeSource { metric: String },

    /// The measurement source refused to attach
    #[error("Failed to attach measurement source for '{metric}': {source}")]
    AttachFailed {
        metric: String,
        #[source]
        source: BoxError,
    },

    /// Turning a raw entry into a report failed
    #[error("Failed to process entry for '{metric}': {source}")]
    Processing {
        metric: String,
        #[source]
        source: BoxError,
    },
}

impl MetricError {
    /// Name of the metric this error belongs to.
    pub fn metric(&self) -> &str {
        match self {
            Self::UnsupportedMetric { metric, .. }
            | Self::UnsupportedTimeSource { metric }
            | Self::AttachFailed { metric, .. }
            | Self::Processing { metric, .. } => metric,
        }
    }

    /// Capability errors are terminal for the lifecycle that raised them.
    pub fn is_capability_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMetric { .. } | Self::UnsupportedTimeSource { .. }
        )
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
