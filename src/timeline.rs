use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

pub const HOURS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

/// Comments per hour of day (UTC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HourHistogram {
    buckets: [u64; HOURS],
}

impl HourHistogram {
    pub fn from_timestamps<'a, I>(timestamps: I) -> Self
    where
        I: IntoIterator<Item = &'a DateTime<Utc>>,
    {
        let mut histogram = HourHistogram::default();
        for ts in timestamps {
            histogram.buckets[ts.hour() as usize] += 1;
        }
        histogram
    }

    pub fn count(&self, hour: u32) -> u64 {
        self.buckets.get(hour as usize).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    pub fn max(&self) -> u64 {
        self.buckets.iter().copied().max().unwrap_or(0)
    }

    /// All 24 hours in order, zero buckets included.
    pub fn hours(&self) -> Vec<HourCount> {
        self.buckets
            .iter()
            .enumerate()
            .map(|(hour, count)| HourCount {
                hour: hour as u32,
                count: *count,
            })
            .collect()
    }

    /// Hours that saw at least one comment.
    pub fn non_empty(&self) -> Vec<HourCount> {
        self.hours().into_iter().filter(|h| h.count > 0).collect()
    }
}
