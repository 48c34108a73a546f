//! Aggregates over timing reports.

use indexmap::IndexMap;

use super::ReportCollection;
use crate::classify::ResourceType;
use crate::report::{LongTaskReport, ResourceTimingReport};

const PERCENTILE_98: f64 = 0.98;

impl ReportCollection<ResourceTimingReport> {
    /// Bytes that crossed the network for every resource.
    pub fn total_transfer_size(&self) -> u64 {
        self.iter().map(ResourceTimingReport::transfer_size).sum()
    }

    /// Mean load time rounded to the nearest millisecond.
    pub fn average_load_time(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self.iter().map(ResourceTimingReport::load_time).sum();
        Some((total / self.total_reports() as f64).round())
    }

    /// Longest-loading resource; the earliest one wins a tie.
    pub fn slowest_resource(&self) -> Option<&ResourceTimingReport> {
        self.iter().fold(None, |slowest, report| match slowest {
            Some(current) if current.load_time() >= report.load_time() => Some(current),
            _ => Some(report),
        })
    }

    /// 98th percentile load time, nearest-rank on a sorted copy.
    pub fn percentile_98_load_time(&self) -> Option<f64> {
        let mut times: Vec<f64> = self.iter().map(ResourceTimingReport::load_time).collect();
        if times.is_empty() {
            return None;
        }
        times.sort_by(f64::total_cmp);
        let index = (times.len() as f64 * PERCENTILE_98).floor() as usize;
        times.get(index).or_else(|| times.last()).copied()
    }

    pub fn resources_by_type(&self) -> IndexMap<ResourceType, Vec<&ResourceTimingReport>> {
        self.group_by(ResourceTimingReport::resource_type)
    }

    pub fn cached_count(&self) -> usize {
        self.iter().filter(|r| r.is_cached()).count()
    }
}

impl ReportCollection<LongTaskReport> {
    /// Sum of the time each task ran past its blocking threshold.
    pub fn total_blocking_time(&self) -> f64 {
        self.iter().map(LongTaskReport::blocking_time).sum()
    }

    pub fn longest_task(&self) -> Option<&LongTaskReport> {
        self.iter().fold(None, |longest, report| match longest {
            Some(current) if current.duration() >= report.duration() => Some(current),
            _ => Some(report),
        })
    }
}
