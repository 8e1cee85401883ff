//! Shared output of a scrape run
//!
//! Units append concurrently; every append is one short critical section and
//! never spans an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{CloudwatchMetricResult, TaggedResource};

/// Everything a scrape run produced
///
/// `resources` and `metrics` are appended in completion order; the only link
/// between a metric result and the unit that produced it is its
/// [`crate::JobContext`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeResults {
    /// One batch per discovery unit that contributed output
    pub resources: Vec<Vec<TaggedResource>>,

    /// One entry per unit that contributed output
    pub metrics: Vec<CloudwatchMetricResult>,
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    inner: Mutex<ScrapeResults>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    // Every append is a single push, poisoning leaves nothing half-written
    fn lock(&self) -> MutexGuard<'_, ScrapeResults> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the output of a discovery unit
    pub fn add_discovery(&self, resources: Vec<TaggedResource>, metrics: CloudwatchMetricResult) {
        let mut results = self.lock();
        results.resources.push(resources);
        results.metrics.push(metrics);
    }

    /// Record the output of a static or custom namespace unit
    pub fn add_metrics(&self, metrics: CloudwatchMetricResult) {
        self.lock().metrics.push(metrics);
    }

    /// Move the collected results out, leaving the aggregator empty
    pub fn take(&self) -> ScrapeResults {
        std::mem::take(&mut *self.lock())
    }
}
