//! Aggregates over rated Web Vitals reports.

use serde::{Deserialize, Serialize};

use super::ReportCollection;
use crate::classify::Rating;
use crate::report::{RatedReport, WebVital};

/// Number of reports in each rating tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingCounts {
    pub good: usize,
    pub needs_improvement: usize,
    pub poor: usize,
}

impl RatingCounts {
    pub fn total(&self) -> usize {
        self.good + self.needs_improvement + self.poor
    }

    /// Share of GOOD reports (0.0 to 1.0), 0.0 when empty.
    pub fn good_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.good as f64 / total as f64,
        }
    }
}

impl ReportCollection<RatedReport> {
    /// Sum of every value, in arrival order.
    pub fn cumulative_value(&self) -> f64 {
        self.iter().map(RatedReport::value).sum()
    }

    pub fn rating_counts(&self) -> RatingCounts {
        self.iter()
            .fold(RatingCounts::default(), |mut counts, report| {
                match report.rating() {
                    Rating::Good => counts.good += 1,
                    Rating::NeedsImprovement => counts.needs_improvement += 1,
                    Rating::Poor => counts.poor += 1,
                }
                counts
            })
    }

    /// Highest value; the earliest report wins a tie.
    pub fn worst_report(&self) -> Option<&RatedReport> {
        self.iter().fold(None, |worst, report| match worst {
            Some(current) if current.value() >= report.value() => Some(current),
            _ => Some(report),
        })
    }

    pub fn reports_for(&self, metric: WebVital) -> Vec<&RatedReport> {
        self.iter().filter(|r| r.metric() == metric).collect()
    }
}
