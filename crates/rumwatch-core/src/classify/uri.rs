//! URI helpers shared by the error classifiers.
//!
//! None of these fail: unparseable input falls back to a conservative
//! answer instead of an error.

use url::Url;

const SPECIAL_KEYWORDS: [&str; 2] = ["inline", "eval"];
const SPECIAL_PREFIXES: [&str; 4] = ["data:", "blob:", "about:", "javascript:"];

/// Whether `uri` is one of the pseudo-URIs a CSP report uses instead of a
/// real location (`inline`, `eval`, `data:`, `blob:`, `about:`, `javascript:`).
pub fn is_special_csp_uri(uri: &str) -> bool {
    let uri = uri.trim();
    SPECIAL_KEYWORDS.contains(&uri) || SPECIAL_PREFIXES.iter().any(|p| uri.starts_with(p))
}

fn hostname(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    url.host_str().map(|host| host.to_ascii_lowercase())
}

/// Whether `url` is served from a different host than `origin`.
///
/// Unknown origin, unparseable URLs and host-less URLs count as first-party.
pub fn is_third_party(url: &str, origin: Option<&str>) -> bool {
    let Some(origin) = origin else {
        return false;
    };
    match (hostname(url), hostname(origin)) {
        (Some(host), Some(origin_host)) => host != origin_host,
        _ => false,
    }
}

/// Domain of `uri` for grouping: the pseudo-URI itself for special CSP
/// values, the hostname when parseable, otherwise the raw string.
pub fn extract_domain(uri: &str) -> String {
    if is_special_csp_uri(uri) {
        return uri.trim().to_string();
    }
    hostname(uri).unwrap_or_else(|| uri.to_string())
}
