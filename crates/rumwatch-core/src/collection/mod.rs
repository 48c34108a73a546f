//! Immutable report collections and their aggregates.
//!
//! A [`ReportCollection`] is built once from a finished list of reports and
//! never changes afterwards. Aggregates are recomputed from the list on
//! every call, so two reads always agree. Family-specific aggregates live in
//! the submodules as inherent impls on the concrete collection type:
//!
//! - [`timing`]: transfer sizes, load-time statistics, blocking time
//! - [`vitals`]: cumulative values and rating counts
//! - [`errors`]: severity counts for any [`SeverityReport`](crate::report::SeverityReport)

pub mod errors;
pub mod timing;
pub mod vitals;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

use crate::error::TimeError;
use crate::report::Report;
use crate::time::{TimeSource, TimeValue};

pub use errors::SeverityCounts;
pub use vitals::RatingCounts;

/// Ordered, read-only list of reports of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCollection<T> {
    id: String,
    created_at: TimeValue,
    reports: Vec<T>,
}

impl<T: Report> ReportCollection<T> {
    pub fn new(id: impl Into<String>, created_at: TimeValue, reports: Vec<T>) -> Self {
        Self {
            id: id.into(),
            created_at,
            reports,
        }
    }

    /// Collection with a random id, created now.
    pub fn generate(source: &dyn TimeSource, reports: Vec<T>) -> Result<Self, TimeError> {
        Ok(Self::new(
            Uuid::new_v4().to_string(),
            TimeValue::now(source)?,
            reports,
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> TimeValue {
        self.created_at
    }

    /// Reports in arrival order.
    pub fn reports(&self) -> &[T] {
        &self.reports
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.reports.iter()
    }

    pub fn total_reports(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn first_report(&self) -> Option<&T> {
        self.reports.first()
    }

    pub fn last_report(&self) -> Option<&T> {
        self.reports.last()
    }

    /// Group reports by `key`. Groups appear in the order their first
    /// member arrived and keep arrival order inside.
    pub fn group_by<K, F>(&self, key: F) -> IndexMap<K, Vec<&T>>
    where
        K: Hash + Eq,
        F: Fn(&T) -> K,
    {
        let mut groups: IndexMap<K, Vec<&T>> = IndexMap::new();
        for report in &self.reports {
            groups.entry(key(report)).or_default().push(report);
        }
        groups
    }
}

impl<'a, T: Report> IntoIterator for &'a ReportCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}

impl<T: Report> fmt::Display for ReportCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} COLLECTION]: {} reports", T::KIND, self.reports.len())
    }
}

impl<T: Report> Serialize for ReportCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ReportCollection", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("kind", T::KIND)?;
        state.serialize_field("totalReports", &self.reports.len())?;
        state.serialize_field("reports", &self.reports)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ResourceType;
    use crate::report::{ReportMeta, ResourceErrorReport};
    use crate::time::ManualTimeSource;

    fn error(id: &str, url: &str, resource_type: ResourceType) -> ResourceErrorReport {
        let src = ManualTimeSource::new(0.0);
        let t = TimeValue::from_relative(&src, 1.0).unwrap();
        ResourceErrorReport::new(ReportMeta::new(id, t, t), url, resource_type, true)
    }

    fn collection() -> ReportCollection<ResourceErrorReport> {
        let src = ManualTimeSource::new(0.0);
        ReportCollection::new(
            "c-1",
            TimeValue::from_relative(&src, 9.0).unwrap(),
            vec![
                error("a", "/a.png", ResourceType::Image),
                error("b", "/b.js", ResourceType::Script),
                error("c", "/c.png", ResourceType::Image),
            ],
        )
    }

    #[test]
    fn test_basic_accessors() {
        let c = collection();
        assert_eq!(c.total_reports(), 3);
        assert!(!c.is_empty());
        assert_eq!(c.first_report().map(|r| r.id()), Some("a"));
        assert_eq!(c.last_report().map(|r| r.id()), Some("c"));
        assert_eq!(c.iter().count(), 3);
        assert_eq!(c.to_string(), "[RESOURCE_ERROR COLLECTION]: 3 reports");
    }

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let c = collection();
        let groups = c.group_by(|r| r.resource_type());
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![ResourceType::Image, ResourceType::Script]);
        let images: Vec<_> = groups[&ResourceType::Image].iter().map(|r| r.id()).collect();
        assert_eq!(images, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_collection() {
        let src = ManualTimeSource::new(0.0);
        let c: ReportCollection<ResourceErrorReport> = ReportCollection::generate(&src, Vec::new()).unwrap();
        assert!(c.is_empty());
        assert!(c.first_report().is_none());
        assert!(c.group_by(|r| r.url().to_string()).is_empty());
        assert_eq!(c.to_string(), "[RESOURCE_ERROR COLLECTION]: 0 reports");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(collection()).unwrap();
        assert_eq!(json["id"], "c-1");
        assert_eq!(json["kind"], "RESOURCE_ERROR");
        assert_eq!(json["totalReports"], 3);
        assert_eq!(json["reports"][1]["id"], "b");
    }
}
