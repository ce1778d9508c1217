//! Per-measurement handle.

use std::time::Instant;

use dnmetrics_core::error::Result;
use dnmetrics_core::histogram::Histogram;
use dnmetrics_core::labels::LabelSet;

/// One measurement: a start time plus a shared reference to the registry's
/// histogram.
///
/// Each `record` call adds one observation; recording twice on the same
/// handle counts twice.
#[derive(Debug)]
pub struct MetricHandle {
    histogram: Histogram,
    started_at: Instant,
}

impl MetricHandle {
    /// Start measuring now against `histogram`.
    pub fn new(histogram: Histogram) -> Self {
        Self {
            histogram,
            started_at: Instant::now(),
        }
    }

    /// Fully-qualified metric name.
    pub fn name(&self) -> &str {
        self.histogram.name()
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Seconds since the handle was created. Monotonic.
    pub fn elapsed(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn record_elapsed(&self, labels: Option<&LabelSet>) -> Result<()> {
        self.record(self.elapsed(), labels)
    }

    /// Observe `value`. Empty `labels` are treated as absent.
    pub fn record(&self, value: f64, labels: Option<&LabelSet>) -> Result<()> {
        match labels {
            Some(labels) if !labels.is_empty() => self.histogram.with_labels(labels)?.observe(value),
            _ => self.histogram.observe(value),
        }
    }
}
