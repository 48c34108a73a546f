//! Rated Web Vitals reports.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{check_measure, round_to, Report, ReportMeta};
use crate::classify::{Rating, Thresholds};
use crate::error::ReportError;

/// The five Web Vitals the core knows how to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebVital {
    /// Largest Contentful Paint
    Lcp,
    /// First Contentful Paint
    Fcp,
    /// First Input Delay
    Fid,
    /// Interaction to Next Paint
    Inp,
    /// Cumulative Layout Shift
    Cls,
}

impl WebVital {
    pub const ALL: [WebVital; 5] = [Self::Lcp, Self::Fcp, Self::Fid, Self::Inp, Self::Cls];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lcp => "LCP",
            Self::Fcp => "FCP",
            Self::Fid => "FID",
            Self::Inp => "INP",
            Self::Cls => "CLS",
        }
    }

    /// Performance entry type the host must support to observe this vital.
    pub fn entry_type(&self) -> &'static str {
        match self {
            Self::Lcp => "largest-contentful-paint",
            Self::Fcp => "paint",
            Self::Fid => "first-input",
            Self::Inp => "event",
            Self::Cls => "layout-shift",
        }
    }

    pub fn default_thresholds(&self) -> Thresholds {
        let (good, poor) = match self {
            Self::Lcp => (2500.0, 4000.0),
            Self::Fcp => (1800.0, 3000.0),
            Self::Fid => (100.0, 300.0),
            Self::Inp => (200.0, 500.0),
            Self::Cls => (0.1, 0.25),
        };
        Thresholds { good, poor }
    }

    /// Display unit; CLS is unitless.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Cls => "",
            _ => "ms",
        }
    }

    fn display_decimals(&self) -> i32 {
        match self {
            Self::Cls => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for WebVital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One measured value of a Web Vital with the thresholds it is rated against.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedReport {
    meta: ReportMeta,
    metric: WebVital,
    value: f64,
    thresholds: Thresholds,
}

impl RatedReport {
    pub fn new(
        meta: ReportMeta,
        metric: WebVital,
        value: f64,
        thresholds: Thresholds,
    ) -> Result<Self, ReportError> {
        thresholds
            .validate(metric.name())
            .map_err(|err| ReportError::InvalidThresholds {
                metric: metric.name(),
                message: err.to_string(),
            })?;
        Ok(Self {
            meta,
            metric,
            value: check_measure("value", value)?,
            thresholds,
        })
    }

    pub fn metric(&self) -> WebVital {
        self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn good_threshold(&self) -> f64 {
        self.thresholds.good
    }

    pub fn poor_threshold(&self) -> f64 {
        self.thresholds.poor
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn rating(&self) -> Rating {
        self.thresholds.rate(self.value)
    }
}

impl Report for RatedReport {
    const KIND: &'static str = "WEB_VITAL";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl fmt::Display for RatedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]: {}{} ({})",
            self.metric,
            round_to(self.value, self.metric.display_decimals()),
            self.metric.unit(),
            self.rating()
        )
    }
}

impl Serialize for RatedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RatedReport", 8)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("name", self.metric.name())?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("goodThreshold", &self.thresholds.good)?;
        state.serialize_field("poorThreshold", &self.thresholds.poor)?;
        state.serialize_field("rating", &self.rating())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{ManualTimeSource, TimeValue};

    fn report(metric: WebVital, value: f64) -> RatedReport {
        let src = ManualTimeSource::new(0.0);
        let t = TimeValue::from_relative(&src, 100.0).unwrap();
        RatedReport::new(
            ReportMeta::new("vital-1", t, t),
            metric,
            value,
            metric.default_thresholds(),
        )
        .unwrap()
    }

    #[test]
    fn test_rating_at_boundaries() {
        assert_eq!(report(WebVital::Lcp, 2499.9).rating(), Rating::Good);
        assert_eq!(report(WebVital::Lcp, 2500.0).rating(), Rating::NeedsImprovement);
        assert_eq!(report(WebVital::Lcp, 4000.0).rating(), Rating::Poor);
        assert_eq!(report(WebVital::Cls, 0.1).rating(), Rating::NeedsImprovement);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            report(WebVital::Lcp, 2500.0).to_string(),
            "[LCP]: 2500ms (NEEDS_IMPROVEMENT)"
        );
        assert_eq!(report(WebVital::Fid, 12.3456).to_string(), "[FID]: 12.35ms (GOOD)");
        assert_eq!(report(WebVital::Cls, 0.05 + 0.18 + 0.35).to_string(), "[CLS]: 0.58 (POOR)");
    }

    #[test]
    fn test_rejects_negative_value() {
        let src = ManualTimeSource::new(0.0);
        let t = TimeValue::from_relative(&src, 0.0).unwrap();
        let err = RatedReport::new(
            ReportMeta::new("x", t, t),
            WebVital::Inp,
            -5.0,
            WebVital::Inp.default_thresholds(),
        )
        .unwrap_err();
        assert_eq!(err, ReportError::InvalidValue { field: "value", value: -5.0 });
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let src = ManualTimeSource::new(0.0);
        let t = TimeValue::from_relative(&src, 0.0).unwrap();
        let err = RatedReport::new(
            ReportMeta::new("x", t, t),
            WebVital::Lcp,
            3000.0,
            Thresholds {
                good: 4000.0,
                poor: 2500.0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidThresholds { metric: "LCP", .. }));
    }

    #[test]
    fn test_json_includes_rating() {
        let json = serde_json::to_value(report(WebVital::Fcp, 3200.0)).unwrap();
        assert_eq!(json["id"], "vital-1");
        assert_eq!(json["name"], "FCP");
        assert_eq!(json["goodThreshold"], 1800.0);
        assert_eq!(json["poorThreshold"], 3000.0);
        assert_eq!(json["rating"], "POOR");
        assert_eq!(json["occurredAt"]["relative"], 100.0);
    }

    #[test]
    fn test_presets() {
        assert_eq!(WebVital::ALL.len(), 5);
        for vital in WebVital::ALL {
            assert!(vital.default_thresholds().validate(vital.name()).is_ok());
        }
        assert_eq!(WebVital::Inp.entry_type(), "event");
    }
}
