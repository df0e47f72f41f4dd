use super::timestamp::{Segment, TimeWeighted};
use super::{Monitor, TimestampMonitor, Value};
use crate::output_analysis::Statistics;

/// A read-only union of several monitors.  The sources are referenced, not
/// copied, so later tallies on a source show up in the merged statistics.
#[derive(Debug, Clone)]
pub struct MergedMonitor<'a> {
    sources: Vec<&'a Monitor>,
}

impl<'a> MergedMonitor<'a> {
    pub fn new(sources: Vec<&'a Monitor>) -> Self {
        Self { sources }
    }

    /// The raw number of samples, over all sources.
    pub fn len(&self) -> usize {
        self.sources.iter().map(|source| source.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Statistics for MergedMonitor<'_> {
    fn observations(&self) -> Vec<(Value, f64)> {
        self.sources
            .iter()
            .flat_map(|source| source.observations())
            .collect()
    }
}

/// A read-only union of several timestamp monitors.  The time-weighted
/// segments of all sources are interleaved chronologically - by segment
/// start, and by source order for simultaneous segments.
#[derive(Debug, Clone)]
pub struct MergedTimestampMonitor<'a> {
    sources: Vec<&'a TimestampMonitor>,
}

impl<'a> MergedTimestampMonitor<'a> {
    pub fn new(sources: Vec<&'a TimestampMonitor>) -> Self {
        Self { sources }
    }

    pub fn view(&self, now: f64) -> TimeWeighted {
        let mut segments: Vec<Segment> = self
            .sources
            .iter()
            .flat_map(|source| source.segments(now))
            .collect();
        // Stable, so simultaneous segments keep source order
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        TimeWeighted { segments }
    }
}
