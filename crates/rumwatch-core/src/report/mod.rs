//! Immutable report objects.
//!
//! Every report carries a [`ReportMeta`] (id, creation time, occurrence
//! time) plus its own measured fields. Fields are private and set once by a
//! validating constructor; classification (rating, severity) is derived on
//! each call rather than stored.
//!
//! - [`vitals`]: rated Web Vitals reports.
//! - [`errors`]: severity-classified error reports.
//! - [`timing`]: resource, network, navigation and long-task timing.

pub mod errors;
pub mod timing;
pub mod vitals;

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::classify::Severity;
use crate::error::{ReportError, TimeError};
use crate::time::{TimeSource, TimeValue};

pub use errors::{
    CspDisposition, CspViolationDetails, CspViolationReport, JsErrorDetails, JsErrorReport,
    PromiseRejectionReport, RejectionReason, ResourceErrorReport,
};
pub use timing::{
    LongTaskReport, NavigationTimingReport, NetworkPhases, NetworkTimingReport,
    ResourceTimingReport, TransferSizes, DEFAULT_LONG_TASK_THRESHOLD_MS,
};
pub use vitals::{RatedReport, WebVital};

/// Fields shared by every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    id: String,
    created_at: TimeValue,
    occurred_at: TimeValue,
}

impl ReportMeta {
    pub fn new(id: impl Into<String>, created_at: TimeValue, occurred_at: TimeValue) -> Self {
        Self {
            id: id.into(),
            created_at,
            occurred_at,
        }
    }

    /// Random id, created now, for an event that happened at `occurred_at`.
    pub fn generate(source: &dyn TimeSource, occurred_at: TimeValue) -> Result<Self, TimeError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: TimeValue::now(source)?,
            occurred_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> TimeValue {
        self.created_at
    }

    pub fn occurred_at(&self) -> TimeValue {
        self.occurred_at
    }
}

/// Common surface of every report type.
pub trait Report: fmt::Display + Serialize {
    /// Label used in collection summaries.
    const KIND: &'static str;

    fn meta(&self) -> &ReportMeta;

    fn id(&self) -> &str {
        self.meta().id()
    }

    fn created_at(&self) -> TimeValue {
        self.meta().created_at()
    }

    fn occurred_at(&self) -> TimeValue {
        self.meta().occurred_at()
    }
}

/// Reports classified on the four-tier severity scale.
pub trait SeverityReport: Report {
    fn severity(&self) -> Severity;
}

pub(crate) fn check_measure(field: &'static str, value: f64) -> Result<f64, ReportError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ReportError::InvalidValue { field, value })
    }
}

/// Round for display; `f64` formatting already drops a trailing `.0`.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTimeSource;

    #[test]
    fn test_generate_stamps_creation_time() {
        let src = ManualTimeSource::new(1_000.0);
        let occurred = TimeValue::from_relative(&src, 10.0).unwrap();
        src.set_now(25.0);

        let meta = ReportMeta::generate(&src, occurred).unwrap();
        assert_eq!(meta.created_at().relative(), 25.0);
        assert_eq!(meta.occurred_at().relative(), 10.0);
        assert!(Uuid::parse_str(meta.id()).is_ok());
    }

    #[test]
    fn test_meta_json_is_camel_case() {
        let src = ManualTimeSource::new(0.0);
        let t = TimeValue::from_relative(&src, 5.0).unwrap();
        let json = serde_json::to_value(ReportMeta::new("r-1", t, t)).unwrap();
        assert_eq!(json["id"], "r-1");
        assert_eq!(json["createdAt"]["relative"], 5.0);
        assert_eq!(json["occurredAt"]["absolute"], 5.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(123.456, 2), 123.46);
        assert_eq!(round_to(0.05 + 0.18 + 0.35, 4), 0.58);
        assert_eq!(round_to(2500.0, 2).to_string(), "2500");
    }

    #[test]
    fn test_check_measure_rejects_bad_numbers() {
        assert_eq!(check_measure("value", 1.5), Ok(1.5));
        assert!(check_measure("value", -0.1).is_err());
        assert!(check_measure("value", f64::NAN).is_err());
    }
}
