//! Aggregates over severity-classified reports.

use serde::{Deserialize, Serialize};

use super::ReportCollection;
use crate::classify::Severity;
use crate::report::SeverityReport;

/// Number of reports at each severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

impl<T: SeverityReport> ReportCollection<T> {
    pub fn severity_counts(&self) -> SeverityCounts {
        self.iter()
            .fold(SeverityCounts::default(), |mut counts, report| {
                match report.severity() {
                    Severity::Low => counts.low += 1,
                    Severity::Medium => counts.medium += 1,
                    Severity::High => counts.high += 1,
                    Severity::Critical => counts.critical += 1,
                }
                counts
            })
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.iter().map(SeverityReport::severity).max()
    }

    /// Reports at `minimum` or above, in arrival order.
    pub fn at_least(&self, minimum: Severity) -> Vec<&T> {
        self.iter().filter(|r| r.severity() >= minimum).collect()
    }
}
