//! Ready-made lifecycles for the Web Vitals and long tasks.
//!
//! Each vital is a configuration of the generic [`MetricLifecycle`]: the
//! entry type it listens to comes from [`WebVital::entry_type`], the value
//! it extracts from [`vital_handler`], and its thresholds from
//! [`RumConfig`].

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::classify::Thresholds;
use crate::config::RumConfig;
use crate::error::{BoxError, ReportError};
use crate::observe::{Host, MeasurementSource, MetricLifecycle};
use crate::report::{check_measure, LongTaskReport, RatedReport, ReportMeta, WebVital};
use crate::time::{TimeSegment, TimeSource, TimeValue};

/// Entry type of main-thread long tasks.
pub const LONG_TASK_ENTRY_TYPE: &str = "longtask";

/// A performance entry as delivered by the host, in milliseconds relative to
/// the time origin. Only the fields a metric reads need to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntry {
    pub entry_type: String,
    pub name: String,
    pub start_time: f64,
    pub duration: Option<f64>,
    /// Layout shift score.
    pub value: Option<f64>,
    pub processing_start: Option<f64>,
    pub had_recent_input: bool,
    pub attribution: Vec<String>,
}

impl RawEntry {
    pub fn new(entry_type: impl Into<String>, start_time: f64) -> Self {
        Self {
            entry_type: entry_type.into(),
            start_time,
            ..Default::default()
        }
    }
}

/// Build the handler that turns raw entries of `vital` into rated reports.
///
/// - LCP and FCP report the entry's `start_time`.
/// - FID reports `processing_start - start_time`.
/// - INP reports the longest interaction `duration` seen so far.
/// - CLS reports the running sum of shift scores, skipping shifts that
///   followed recent user input.
pub fn vital_handler(
    vital: WebVital,
    thresholds: Thresholds,
    time_source: Rc<dyn TimeSource>,
) -> impl FnMut(&RawEntry) -> Result<RatedReport, BoxError> {
    let mut cumulative_shift = 0.0;
    let mut longest_interaction = 0.0_f64;

    move |entry: &RawEntry| -> Result<RatedReport, BoxError> {
        let value = match vital {
            WebVital::Lcp | WebVital::Fcp => entry.start_time,
            WebVital::Fid => {
                let processing_start = entry
                    .processing_start
                    .ok_or(ReportError::MissingField("processingStart"))?;
                processing_start - entry.start_time
            }
            WebVital::Inp => {
                let duration = entry.duration.ok_or(ReportError::MissingField("duration"))?;
                longest_interaction = longest_interaction.max(check_measure("duration", duration)?);
                longest_interaction
            }
            WebVital::Cls => {
                let score = entry.value.ok_or(ReportError::MissingField("value"))?;
                let score = check_measure("value", score)?;
                if !entry.had_recent_input {
                    cumulative_shift += score;
                }
                cumulative_shift
            }
        };

        let occurred_at = TimeValue::from_relative(time_source.as_ref(), entry.start_time)?;
        let meta = ReportMeta::generate(time_source.as_ref(), occurred_at)?;
        Ok(RatedReport::new(meta, vital, value, thresholds)?)
    }
}

/// Lifecycle observing one Web Vital through `source`.
pub fn observe_vital(
    vital: WebVital,
    source: impl MeasurementSource<RawEntry> + 'static,
    config: &RumConfig,
    host: &Host,
) -> MetricLifecycle<RawEntry, RatedReport> {
    if source.entry_type() != vital.entry_type() {
        tracing::warn!(
            "Source for {} observes '{}', expected '{}'",
            vital,
            source.entry_type(),
            vital.entry_type()
        );
    }
    let handler = vital_handler(vital, config.thresholds_for(vital), host.shared_time_source());
    MetricLifecycle::new(vital.name(), source, handler, host.clone())
}

/// Build the handler that turns `longtask` entries into reports.
pub fn long_task_handler(
    blocking_threshold: f64,
    time_source: Rc<dyn TimeSource>,
) -> impl FnMut(&RawEntry) -> Result<LongTaskReport, BoxError> {
    move |entry: &RawEntry| -> Result<LongTaskReport, BoxError> {
        let duration = entry.duration.ok_or(ReportError::MissingField("duration"))?;
        let segment = TimeSegment::from_raw_timing(
            time_source.as_ref(),
            entry.start_time,
            entry.start_time + duration,
        )?;
        let meta = ReportMeta::generate(time_source.as_ref(), segment.start())?;
        Ok(LongTaskReport::new(
            meta,
            segment,
            entry.attribution.clone(),
            blocking_threshold,
        )?)
    }
}

/// Lifecycle observing long tasks, using the configured blocking threshold.
pub fn observe_long_tasks(
    source: impl MeasurementSource<RawEntry> + 'static,
    config: &RumConfig,
    host: &Host,
) -> MetricLifecycle<RawEntry, LongTaskReport> {
    let handler = long_task_handler(
        config.long_task.blocking_threshold_ms,
        host.shared_time_source(),
    );
    MetricLifecycle::new("LONG_TASK", source, handler, host.clone())
}
