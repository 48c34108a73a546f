//! Classification engine.
//!
//! Pure functions that map measured values onto bounded tiers:
//!
//! - [`Rating`]: three tiers for Web Vitals, decided by two thresholds.
//! - [`Severity`]: four tiers for error reports, decided by an ordered
//!   cascade of structural and keyword predicates.
//!
//! Reports call these from their getters; nothing here is ever stored.

mod rating;
mod severity;
mod uri;

pub use rating::{rate, Rating, Thresholds};
pub use severity::{
    classify_csp_violation, classify_js_error, classify_promise_rejection,
    classify_resource_error, ResourceType, Severity,
};
pub use uri::{extract_domain, is_special_csp_uri, is_third_party};
