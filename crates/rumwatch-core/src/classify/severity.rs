//! Four-tier error severity.
//!
//! Each error family has its own cascade of predicates, evaluated top-down
//! with the first match winning. Predicates overlap (a `script-src`
//! violation is also a candidate for the eval rule), so the order below is
//! part of the contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::uri::is_third_party;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource behind a failed load or a timing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Script,
    Stylesheet,
    Image,
    Font,
    Media,
    Other,
}

impl ResourceType {
    /// Map an element tag or initiator type (`script`, `link`, `img`, ...).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "script" => Self::Script,
            "link" | "css" | "stylesheet" => Self::Stylesheet,
            "img" | "image" | "imageset" => Self::Image,
            "font" => Self::Font,
            "video" | "audio" | "media" | "source" | "track" => Self::Media,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Font => "font",
            Self::Media => "media",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const FATAL_KEYWORDS: [&str; 5] = [
    "out of memory",
    "maximum call stack",
    "quota exceeded",
    "securityerror",
    "loading chunk",
];

const BENIGN_KEYWORDS: [&str; 1] = ["resizeobserver loop"];

const NETWORK_KEYWORDS: [&str; 5] = [
    "failed to fetch",
    "networkerror",
    "network request failed",
    "timeout",
    "aborted",
];

const HIGH_ERROR_NAMES: [&str; 3] = ["TypeError", "ReferenceError", "RangeError"];

const HIGH_DIRECTIVES: [&str; 3] = ["style-src", "connect-src", "frame-src"];
const MEDIUM_DIRECTIVES: [&str; 3] = ["img-src", "media-src", "font-src"];

fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lowered.contains(k))
}

fn starts_with_any(directive: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| directive.starts_with(p))
}

/// Severity of a Content-Security-Policy violation.
///
/// Directives match by prefix, so `script-src-elem` counts as `script-src`.
pub fn classify_csp_violation(directive: &str, blocked_uri: &str) -> Severity {
    let directive = directive.trim().to_ascii_lowercase();
    let blocked = blocked_uri.trim();
    let script = directive.starts_with("script-src");

    if script && (blocked == "eval" || blocked == "inline") {
        Severity::Critical
    } else if script || starts_with_any(&directive, &HIGH_DIRECTIVES) {
        Severity::High
    } else if starts_with_any(&directive, &MEDIUM_DIRECTIVES) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity of a resource that failed to load.
pub fn classify_resource_error(resource_type: ResourceType, same_origin: bool) -> Severity {
    match (resource_type, same_origin) {
        (ResourceType::Script, true) => Severity::Critical,
        (ResourceType::Script, false) => Severity::High,
        (ResourceType::Stylesheet, true) => Severity::High,
        (ResourceType::Stylesheet, false) | (ResourceType::Font, _) => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Browsers hide cross-origin script errors behind a generic message.
fn is_masked_error(message: &str, filename: Option<&str>) -> bool {
    let message = message.trim();
    let no_location = filename.map(|f| f.trim().is_empty()).unwrap_or(true);
    message.eq_ignore_ascii_case("script error.")
        || message.eq_ignore_ascii_case("script error")
        || (message.is_empty() && no_location)
}

/// Severity of an uncaught runtime error.
///
/// `origin` is the page origin used to tell first-party from third-party
/// scripts.
pub fn classify_js_error(
    name: &str,
    message: &str,
    filename: Option<&str>,
    origin: Option<&str>,
) -> Severity {
    let lowered = format!("{name}: {message}").to_lowercase();

    if contains_any(&lowered, &FATAL_KEYWORDS) {
        return Severity::Critical;
    }
    if is_masked_error(message, filename) || contains_any(&lowered, &BENIGN_KEYWORDS) {
        return Severity::Low;
    }

    let third_party = filename
        .map(|file| is_third_party(file, origin))
        .unwrap_or(false);
    if HIGH_ERROR_NAMES.contains(&name) && !third_party {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Severity of an unhandled promise rejection.
///
/// `error_name` is `None` when the rejection reason was not an error object;
/// `text` is the reason rendered as text.
pub fn classify_promise_rejection(error_name: Option<&str>, text: &str) -> Severity {
    let lowered = match error_name {
        Some(name) => format!("{name}: {text}").to_lowercase(),
        None => text.to_lowercase(),
    };

    if contains_any(&lowered, &FATAL_KEYWORDS) {
        return Severity::Critical;
    }
    match error_name {
        Some(name) if HIGH_ERROR_NAMES.contains(&name) => Severity::High,
        _ if contains_any(&lowered, &NETWORK_KEYWORDS) => Severity::Medium,
        Some(_) => Severity::Medium,
        None => Severity::Low,
    }
}
