//! # Rumwatch Core Library
//!
//! This library provides the core of a Real User Monitoring agent: it turns
//! raw performance and error entries delivered by a host environment into
//! immutable, classified reports, and hands them to subscribers.
//!
//! ## Architecture
//!
//! - **Time model**: validated instants and intervals anchored to a host
//!   time origin
//! - **Observation**: single-threaded subscription primitives and a lazily
//!   started lifecycle per metric, with deferred replay to late subscribers
//! - **Classification**: three-tier ratings for Web Vitals and four-tier
//!   severities for errors, derived on read
//! - **Collections**: read-only report batches with pure aggregates
//!
//! ## Key Components
//!
//! - [`MetricLifecycle`]: Owns a measurement source and publishes reports
//! - [`Host`]: Capability check, time source and scheduler of the embedder
//! - [`RatedReport`]: A Web Vital value with its rating
//! - [`ReportCollection`]: Ordered batch of reports with aggregates
//! - [`RumConfig`]: Thresholds and page origin

pub mod classify;
pub mod collection;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observe;
pub mod report;
pub mod time;

pub use classify::{Rating, ResourceType, Severity, Thresholds};
pub use collection::ReportCollection;
pub use config::RumConfig;
pub use error::{ConfigError, CoreError, MetricError, ReportError, TimeError};
pub use metrics::{observe_long_tasks, observe_vital, RawEntry};
pub use observe::{Host, LifecycleState, MeasurementSource, MetricLifecycle, MicrotaskQueue};
pub use report::{RatedReport, Report, ReportMeta, SeverityReport, WebVital};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSegment, TimeSource, TimeValue};
