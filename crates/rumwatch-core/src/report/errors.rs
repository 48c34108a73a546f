//! Severity-classified error reports.
//!
//! Each report keeps only what was observed; severity, third-party status
//! and domains are derived from those fields on every call.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Report, ReportMeta, SeverityReport};
use crate::classify::{
    classify_csp_violation, classify_js_error, classify_promise_rejection,
    classify_resource_error, extract_domain, is_special_csp_uri, is_third_party, ResourceType,
    Severity,
};

/// Observed fields of an uncaught runtime error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsErrorDetails {
    pub name: String,
    pub message: String,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsErrorReport {
    meta: ReportMeta,
    details: JsErrorDetails,
    page_origin: Option<String>,
}

impl JsErrorReport {
    /// `page_origin` decides whether the failing script is first-party.
    pub fn new(meta: ReportMeta, details: JsErrorDetails, page_origin: Option<String>) -> Self {
        Self {
            meta,
            details,
            page_origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn message(&self) -> &str {
        &self.details.message
    }

    pub fn filename(&self) -> Option<&str> {
        self.details.filename.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.details.line
    }

    pub fn column(&self) -> Option<u32> {
        self.details.column
    }

    pub fn stack(&self) -> Option<&str> {
        self.details.stack.as_deref()
    }

    pub fn is_third_party(&self) -> bool {
        self.filename()
            .map(|file| is_third_party(file, self.page_origin.as_deref()))
            .unwrap_or(false)
    }

    pub fn domain(&self) -> Option<String> {
        self.filename().map(extract_domain)
    }
}

impl Report for JsErrorReport {
    const KIND: &'static str = "JS_ERROR";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl SeverityReport for JsErrorReport {
    fn severity(&self) -> Severity {
        classify_js_error(
            &self.details.name,
            &self.details.message,
            self.filename(),
            self.page_origin.as_deref(),
        )
    }
}

impl fmt::Display for JsErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[JS_ERROR]: {}: {} ({})",
            self.details.name,
            self.details.message,
            self.severity()
        )
    }
}

impl Serialize for JsErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("JsErrorReport", 12)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("name", &self.details.name)?;
        state.serialize_field("message", &self.details.message)?;
        state.serialize_field("filename", &self.details.filename)?;
        state.serialize_field("line", &self.details.line)?;
        state.serialize_field("column", &self.details.column)?;
        state.serialize_field("stack", &self.details.stack)?;
        state.serialize_field("isThirdParty", &self.is_third_party())?;
        state.serialize_field("domain", &self.domain())?;
        state.serialize_field("severity", &self.severity())?;
        state.end()
    }
}

/// Why a promise was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RejectionReason {
    /// Rejected with an error object.
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    /// Rejected with any other value, rendered as text.
    Value { text: String },
}

impl RejectionReason {
    pub fn error_name(&self) -> Option<&str> {
        match self {
            Self::Error { name, .. } => Some(name),
            Self::Value { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { name, message, .. } => write!(f, "{name}: {message}"),
            Self::Value { text } => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromiseRejectionReport {
    meta: ReportMeta,
    reason: RejectionReason,
}

impl PromiseRejectionReport {
    pub fn new(meta: ReportMeta, reason: RejectionReason) -> Self {
        Self { meta, reason }
    }

    pub fn reason(&self) -> &RejectionReason {
        &self.reason
    }
}

impl Report for PromiseRejectionReport {
    const KIND: &'static str = "PROMISE_REJECTION";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl SeverityReport for PromiseRejectionReport {
    fn severity(&self) -> Severity {
        match &self.reason {
            RejectionReason::Error { name, message, .. } => {
                classify_promise_rejection(Some(name), message)
            }
            RejectionReason::Value { text } => classify_promise_rejection(None, text),
        }
    }
}

impl fmt::Display for PromiseRejectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PROMISE_REJECTION]: {} ({})", self.reason, self.severity())
    }
}

impl Serialize for PromiseRejectionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PromiseRejectionReport", 5)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("reason", &self.reason)?;
        state.serialize_field("severity", &self.severity())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CspDisposition {
    #[default]
    Enforce,
    Report,
}

/// Observed fields of a Content-Security-Policy violation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CspViolationDetails {
    pub effective_directive: String,
    #[serde(rename = "blockedURI")]
    pub blocked_uri: String,
    #[serde(rename = "documentURI")]
    pub document_uri: String,
    pub source_file: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub disposition: CspDisposition,
    pub original_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CspViolationReport {
    meta: ReportMeta,
    details: CspViolationDetails,
    page_origin: Option<String>,
}

impl CspViolationReport {
    pub fn new(meta: ReportMeta, details: CspViolationDetails, page_origin: Option<String>) -> Self {
        Self {
            meta,
            details,
            page_origin,
        }
    }

    pub fn directive(&self) -> &str {
        &self.details.effective_directive
    }

    pub fn blocked_uri(&self) -> &str {
        &self.details.blocked_uri
    }

    pub fn document_uri(&self) -> &str {
        &self.details.document_uri
    }

    pub fn source_file(&self) -> Option<&str> {
        self.details.source_file.as_deref()
    }

    pub fn disposition(&self) -> CspDisposition {
        self.details.disposition
    }

    pub fn details(&self) -> &CspViolationDetails {
        &self.details
    }

    pub fn is_eval_blocked(&self) -> bool {
        self.details.blocked_uri.trim() == "eval"
    }

    pub fn is_inline_blocked(&self) -> bool {
        self.details.blocked_uri.trim() == "inline"
    }

    pub fn blocked_domain(&self) -> String {
        extract_domain(&self.details.blocked_uri)
    }

    /// Pseudo-URIs (`eval`, `data:` ...) never count as third-party.
    pub fn is_third_party(&self) -> bool {
        !is_special_csp_uri(&self.details.blocked_uri)
            && is_third_party(&self.details.blocked_uri, self.page_origin.as_deref())
    }
}

impl Report for CspViolationReport {
    const KIND: &'static str = "CSP_VIOLATION";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl SeverityReport for CspViolationReport {
    fn severity(&self) -> Severity {
        classify_csp_violation(&self.details.effective_directive, &self.details.blocked_uri)
    }
}

impl fmt::Display for CspViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[CSP_VIOLATION]: {} blocked {} ({})",
            self.details.effective_directive,
            self.details.blocked_uri,
            self.severity()
        )
    }
}

impl Serialize for CspViolationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let d = &self.details;
        let mut state = serializer.serialize_struct("CspViolationReport", 15)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("effectiveDirective", &d.effective_directive)?;
        state.serialize_field("blockedURI", &d.blocked_uri)?;
        state.serialize_field("documentURI", &d.document_uri)?;
        state.serialize_field("sourceFile", &d.source_file)?;
        state.serialize_field("lineNumber", &d.line_number)?;
        state.serialize_field("columnNumber", &d.column_number)?;
        state.serialize_field("disposition", &d.disposition)?;
        state.serialize_field("blockedDomain", &self.blocked_domain())?;
        state.serialize_field("isEvalBlocked", &self.is_eval_blocked())?;
        state.serialize_field("isInlineBlocked", &self.is_inline_blocked())?;
        state.serialize_field("isThirdParty", &self.is_third_party())?;
        state.serialize_field("severity", &self.severity())?;
        state.end()
    }
}

/// A resource (script, stylesheet, image ...) that failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceErrorReport {
    meta: ReportMeta,
    url: String,
    resource_type: ResourceType,
    same_origin: bool,
}

impl ResourceErrorReport {
    pub fn new(
        meta: ReportMeta,
        url: impl Into<String>,
        resource_type: ResourceType,
        same_origin: bool,
    ) -> Self {
        Self {
            meta,
            url: url.into(),
            resource_type,
            same_origin,
        }
    }

    /// Derive `same_origin` by comparing `url` with the page origin.
    pub fn for_page(
        meta: ReportMeta,
        url: impl Into<String>,
        resource_type: ResourceType,
        page_origin: Option<&str>,
    ) -> Self {
        let url = url.into();
        let same_origin = !is_third_party(&url, page_origin);
        Self::new(meta, url, resource_type, same_origin)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn is_same_origin(&self) -> bool {
        self.same_origin
    }

    pub fn domain(&self) -> String {
        extract_domain(&self.url)
    }

    /// Scripts and stylesheets block rendering or behaviour when missing.
    pub fn is_critical_resource(&self) -> bool {
        matches!(
            self.resource_type,
            ResourceType::Script | ResourceType::Stylesheet
        )
    }
}

impl Report for ResourceErrorReport {
    const KIND: &'static str = "RESOURCE_ERROR";

    fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

impl SeverityReport for ResourceErrorReport {
    fn severity(&self) -> Severity {
        classify_resource_error(self.resource_type, self.same_origin)
    }
}

impl fmt::Display for ResourceErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[RESOURCE_ERROR]: {} {} ({})",
            self.resource_type,
            self.url,
            self.severity()
        )
    }
}

impl Serialize for ResourceErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResourceErrorReport", 9)?;
        state.serialize_field("id", self.meta.id())?;
        state.serialize_field("createdAt", &self.meta.created_at())?;
        state.serialize_field("occurredAt", &self.meta.occurred_at())?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("resourceType", &self.resource_type)?;
        state.serialize_field("sameOrigin", &self.same_origin)?;
        state.serialize_field("domain", &self.domain())?;
        state.serialize_field("isCriticalResource", &self.is_critical_resource())?;
        state.serialize_field("severity", &self.severity())?;
        state.end()
    }
}
