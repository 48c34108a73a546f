//! Timing reports built from resource, navigation and long-task entries.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{check_measure, round_to, Report, ReportMeta};
use crate::classify::ResourceType;
use crate::error::ReportError;
use crate::time::{TimeSegment, TimeValue};

/// Main-thread work longer than this counts as blocking.
pub const DEFAULT_LONG_TASK_THRESHOLD_MS: f64 = 50.0;

/// Byte counts of a fetched resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferSizes {
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTimingReport {
    meta: ReportMeta,
    name: String,
    initiator_type: String,
    segment: TimeSegment,
    sizes: TransferSizes,
}

impl ResourceTimingReport {
    pub fn new(
        meta: ReportMeta,
        name: impl Into<String>,
        initiator_type: impl Into<String>,
        segment: TimeSegment,
        sizes: TransferSizes,
    ) -> Self {
        Self {
            meta,
            name: name.into(),
            initiator_type: initiator_type.into(),
            segment,
            sizes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initiator_type(&self) -> &str {
        &self.initiator_type
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from_tag(&self.initiator_type)
    }

    pub fn segment(&self) -> TimeSegment {
        self.segment
    }

    pub fn sizes(&self) -> TransferSizes {
        self.sizes
    }

    pub fn transfer_size(&self) -> u64 {
        self.sizes.transfer_size
    }

    pub fn load_time(&self) -> f64 {
        self.segment.duration()
    }

    /// Served from cache: nothing crossed the network but a body was decoded.
    pub fn is_cached(&self) -> bool {
        self.sizes.transfer_size == 0 && self.sizes.decoded_body_size > 0
    }

    /// Decoded size over encoded size, `None` without an encoded body.
    pub fn compression_ratio(&self) -> Option<f64> {
        (self.sizes.encoded_body_size > 0)
            .then(|| self.sizes.decoded_body_size as f64 / self.sizes.encoded_body_size as f64)
    }
}

impl Report for ResourceTimingReport {
    const KIND: &'static str = "RESOURCE";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl fmt::Display for ResourceTimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[RESOURCE]: {} {}ms ({}B)",
            self.name,
            round_to(self.load_time(), 2),
            self.sizes.transfer_size
        )
    }
}

impl Serialize for ResourceTimingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResourceTimingReport", 11)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("initiatorType", &self.initiator_type)?;
        state.serialize_field("resourceType", &self.resource_type())?;
        state.serialize_field("timing", &self.segment)?;
        state.serialize_field("sizes", &self.sizes)?;
        state.serialize_field("loadTime", &self.load_time())?;
        state.serialize_field("isCached", &self.is_cached())?;
        state.serialize_field("compressionRatio", &self.compression_ratio())?;
        state.end()
    }
}

/// Connection phases of one navigation or fetch, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkPhases {
    pub dns: TimeSegment,
    pub tcp: TimeSegment,
    /// Absent for plain-HTTP connections.
    pub tls_handshake: Option<TimeSegment>,
    pub request: TimeSegment,
    pub response: TimeSegment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTimingReport {
    meta: ReportMeta,
    phases: NetworkPhases,
    total: TimeSegment,
    waiting: TimeSegment,
}

impl NetworkTimingReport {
    /// Fails when the response ends before DNS starts or starts before the
    /// request does.
    pub fn new(meta: ReportMeta, phases: NetworkPhases) -> Result<Self, ReportError> {
        let total = TimeSegment::create(phases.dns.start(), phases.response.end())?;
        let waiting = TimeSegment::create(phases.request.start(), phases.response.start())?;
        Ok(Self {
            meta,
            phases,
            total,
            waiting,
        })
    }

    pub fn phases(&self) -> &NetworkPhases {
        &self.phases
    }

    pub fn dns(&self) -> TimeSegment {
        self.phases.dns
    }

    pub fn tcp(&self) -> TimeSegment {
        self.phases.tcp
    }

    pub fn tls_handshake(&self) -> Option<TimeSegment> {
        self.phases.tls_handshake
    }

    pub fn request(&self) -> TimeSegment {
        self.phases.request
    }

    pub fn response(&self) -> TimeSegment {
        self.phases.response
    }

    pub fn total_duration(&self) -> f64 {
        self.total.duration()
    }

    /// Time to first byte: request start to response start.
    pub fn ttfb(&self) -> f64 {
        self.waiting.duration()
    }

    pub fn is_secure(&self) -> bool {
        self.phases.tls_handshake.is_some()
    }
}

impl Report for NetworkTimingReport {
    const KIND: &'static str = "NETWORK";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl fmt::Display for NetworkTimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tls = match self.phases.tls_handshake {
            Some(tls) => format!("{}ms", round_to(tls.duration(), 2)),
            None => "n/a".to_string(),
        };
        write!(
            f,
            "[NETWORK]: {}ms (dns {}ms, tcp {}ms, tls {}, ttfb {}ms)",
            round_to(self.total_duration(), 2),
            round_to(self.phases.dns.duration(), 2),
            round_to(self.phases.tcp.duration(), 2),
            tls,
            round_to(self.ttfb(), 2)
        )
    }
}

impl Serialize for NetworkTimingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.phases;
        let mut state = serializer.serialize_struct("NetworkTimingReport", 10)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("dns", &p.dns)?;
        state.serialize_field("tcp", &p.tcp)?;
        state.serialize_field("tlsHandshake", &p.tls_handshake)?;
        state.serialize_field("request", &p.request)?;
        state.serialize_field("response", &p.response)?;
        state.serialize_field("totalDuration", &self.total_duration())?;
        state.serialize_field("ttfb", &self.ttfb())?;
        state.end()
    }
}

/// Document processing milestones, relative to navigation start.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationTimingReport {
    meta: ReportMeta,
    dom_interactive: TimeValue,
    dom_content_loaded: TimeSegment,
    dom_complete: TimeValue,
    load_event: TimeSegment,
}

impl NavigationTimingReport {
    pub fn new(
        meta: ReportMeta,
        dom_interactive: TimeValue,
        dom_content_loaded: TimeSegment,
        dom_complete: TimeValue,
        load_event: TimeSegment,
    ) -> Result<Self, ReportError> {
        // Rejects a document that completed before becoming interactive.
        TimeSegment::create(dom_interactive, dom_complete)?;
        Ok(Self {
            meta,
            dom_interactive,
            dom_content_loaded,
            dom_complete,
            load_event,
        })
    }

    pub fn dom_interactive(&self) -> TimeValue {
        self.dom_interactive
    }

    pub fn dom_content_loaded(&self) -> TimeSegment {
        self.dom_content_loaded
    }

    pub fn dom_complete(&self) -> TimeValue {
        self.dom_complete
    }

    pub fn load_event(&self) -> TimeSegment {
        self.load_event
    }

    /// Interactive to complete.
    pub fn dom_processing_time(&self) -> f64 {
        self.dom_complete.relative() - self.dom_interactive.relative()
    }
}

impl Report for NavigationTimingReport {
    const KIND: &'static str = "DOM";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl fmt::Display for NavigationTimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DOM]: interactive {}ms, contentLoaded {}ms, complete {}ms",
            round_to(self.dom_interactive.relative(), 2),
            round_to(self.dom_content_loaded.end().relative(), 2),
            round_to(self.dom_complete.relative(), 2)
        )
    }
}

impl Serialize for NavigationTimingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NavigationTimingReport", 8)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("domInteractive", &self.dom_interactive)?;
        state.serialize_field("domContentLoaded", &self.dom_content_loaded)?;
        state.serialize_field("domComplete", &self.dom_complete)?;
        state.serialize_field("loadEvent", &self.load_event)?;
        state.serialize_field("domProcessingTime", &self.dom_processing_time())?;
        state.end()
    }
}

/// A main-thread task that ran past the blocking threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct LongTaskReport {
    meta: ReportMeta,
    segment: TimeSegment,
    attribution: Vec<String>,
    blocking_threshold: f64,
}

impl LongTaskReport {
    pub fn new(
        meta: ReportMeta,
        segment: TimeSegment,
        attribution: Vec<String>,
        blocking_threshold: f64,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            meta,
            segment,
            attribution,
            blocking_threshold: check_measure("blocking_threshold", blocking_threshold)?,
        })
    }

    pub fn segment(&self) -> TimeSegment {
        self.segment
    }

    pub fn duration(&self) -> f64 {
        self.segment.duration()
    }

    /// Container names the host attributed the task to.
    pub fn attribution(&self) -> &[String] {
        &self.attribution
    }

    pub fn blocking_threshold(&self) -> f64 {
        self.blocking_threshold
    }

    /// Portion of the task beyond the threshold.
    pub fn blocking_time(&self) -> f64 {
        (self.duration() - self.blocking_threshold).max(0.0)
    }
}

impl Report for LongTaskReport {
    const KIND: &'static str = "LONG_TASK";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl fmt::Display for LongTaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[LONG_TASK]: {}ms", round_to(self.duration(), 2))
    }
}

impl Serialize for LongTaskReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LongTaskReport", 7)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("timing", &self.segment)?;
        state.serialize_field("attribution", &self.attribution)?;
        state.serialize_field("duration", &self.duration())?;
        state.serialize_field("blockingTime", &self.blocking_time())?;
        state.end()
    }
}
