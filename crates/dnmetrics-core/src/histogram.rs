//! Histogram primitive with optional label-scoped child series.
//!
//! Every series keeps a count, a running `f64` sum and one counter per bucket,
//! all as atomics, so `observe` never takes a lock. Labeled children live in a
//! `DashMap` keyed by label values in declared order and are created lazily on
//! first use. The unlabeled series and the labeled children are independent;
//! family totals are computed from snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;

/// Default upper bounds in seconds, tuned for request latencies.
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Label name reserved for bucket boundaries.
const RESERVED_LABEL: &str = "le";

/// Construction options for a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOpts {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub buckets: Vec<f64>,
}

impl HistogramOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }

    pub fn label_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }
}

/// Point-in-time copy of one series.
///
/// `buckets` holds cumulative counts per finite upper bound; the implicit
/// `+Inf` bucket always equals `count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<(f64, u64)>,
}

/// Point-in-time copy of a whole histogram family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub unlabeled: HistogramSnapshot,
    pub series: Vec<(LabelSet, HistogramSnapshot)>,
}

impl FamilySnapshot {
    /// Observation count across the unlabeled series and every child.
    pub fn total_count(&self) -> u64 {
        self.unlabeled.count + self.series.iter().map(|(_, s)| s.count).sum::<u64>()
    }

    /// Observation sum across the unlabeled series and every child.
    pub fn total_sum(&self) -> f64 {
        self.unlabeled.sum + self.series.iter().map(|(_, s)| s.sum).sum::<f64>()
    }

    /// Snapshot of the child matching `labels`, if it has been created.
    pub fn series(&self, labels: &LabelSet) -> Option<&HistogramSnapshot> {
        self.series
            .iter()
            .find(|(l, _)| l == labels)
            .map(|(_, s)| s)
    }
}

#[derive(Debug)]
struct Series {
    count: AtomicU64,
    sum_bits: AtomicU64,
    buckets: Vec<AtomicU64>,
}

impl Series {
    fn new(bucket_count: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            buckets: (0..bucket_count).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, upper_bounds: &[f64], value: f64) {
        // Non-cumulative: only the first matching bucket; values above the
        // last bound only show up in `count` (+Inf).
        if let Some(i) = upper_bounds.iter().position(|&b| value <= b) {
            self.buckets[i].fetch_add(1, Ordering::Relaxed);
        }

        let mut current = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self.sum_bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, upper_bounds: &[f64]) -> HistogramSnapshot {
        let mut cumulative = 0u64;
        let buckets = upper_bounds
            .iter()
            .zip(self.buckets.iter())
            .map(|(&le, c)| {
                cumulative += c.load(Ordering::Relaxed);
                (le, cumulative)
            })
            .collect();
        // Concurrent writers may bump a bucket before `count`.
        let count = self.count.load(Ordering::Relaxed).max(cumulative);

        HistogramSnapshot {
            count,
            sum: f64::from_bits(self.sum_bits.load(Ordering::Relaxed)),
            buckets,
        }
    }
}

#[derive(Debug)]
struct Family {
    opts: HistogramOpts,
    unlabeled: Series,
    children: DashMap<Vec<String>, Arc<Series>>,
}

impl Family {
    fn check_value(&self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(MetricsError::InvalidValue {
                metric: self.opts.name.clone(),
                value,
            });
        }
        Ok(())
    }
}

/// A named histogram. Cloning is cheap and every clone refers to the same
/// underlying counters.
#[derive(Debug, Clone)]
pub struct Histogram {
    inner: Arc<Family>,
}

impl Histogram {
    /// Validate `opts` and build an empty histogram.
    pub fn new(mut opts: HistogramOpts) -> Result<Self> {
        validate_metric_name(&opts.name)?;
        validate_label_names(&opts.name, &opts.label_names)?;
        opts.buckets = validate_buckets(&opts.buckets)?;

        let unlabeled = Series::new(opts.buckets.len());
        Ok(Self {
            inner: Arc::new(Family {
                opts,
                unlabeled,
                children: DashMap::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.opts.name
    }

    pub fn help(&self) -> &str {
        &self.inner.opts.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.inner.opts.label_names
    }

    /// Finite upper bounds, strictly increasing.
    pub fn buckets(&self) -> &[f64] {
        &self.inner.opts.buckets
    }

    /// True when both handles point at the same histogram.
    pub fn ptr_eq(a: &Histogram, b: &Histogram) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Record on the unlabeled series.
    ///
    /// Fails when the histogram declares label names: a labeled family needs
    /// label values for every observation.
    pub fn observe(&self, value: f64) -> Result<()> {
        let family = &self.inner;
        if !family.opts.label_names.is_empty() {
            return Err(MetricsError::LabelMismatch {
                metric: family.opts.name.clone(),
                expected: family.opts.label_names.clone(),
                got: Vec::new(),
            });
        }
        family.check_value(value)?;
        family.unlabeled.observe(&family.opts.buckets, value);
        Ok(())
    }

    /// Label-scoped accessor. The key set of `labels` must match the declared
    /// label names exactly.
    pub fn with_labels(&self, labels: &LabelSet) -> Result<HistogramChild> {
        let family = &self.inner;
        if family.opts.label_names.is_empty() {
            return Err(MetricsError::LabelMismatch {
                metric: family.opts.name.clone(),
                expected: Vec::new(),
                got: labels.keys(),
            });
        }
        let values = labels.resolve(&family.opts.name, &family.opts.label_names)?;

        if let Some(series) = family.children.get(&values) {
            return Ok(self.child(Arc::clone(series.value())));
        }

        let series = family
            .children
            .entry(values)
            .or_insert_with(|| {
                tracing::trace!(metric = %family.opts.name, "labeled series created");
                Arc::new(Series::new(family.opts.buckets.len()))
            })
            .value()
            .clone();
        Ok(self.child(series))
    }

    fn child(&self, series: Arc<Series>) -> HistogramChild {
        HistogramChild {
            family: Arc::clone(&self.inner),
            series,
        }
    }

    /// Snapshot of the unlabeled series.
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.inner.unlabeled.snapshot(&self.inner.opts.buckets)
    }

    /// Snapshot of one labeled series, `None` if nothing was recorded for it.
    ///
    /// An empty set on an unlabeled histogram addresses the unlabeled series,
    /// the same way an empty set is recorded there.
    pub fn series_snapshot(&self, labels: &LabelSet) -> Result<Option<HistogramSnapshot>> {
        let family = &self.inner;
        if labels.is_empty() && family.opts.label_names.is_empty() {
            return Ok(Some(self.snapshot()));
        }
        let values = labels.resolve(&family.opts.name, &family.opts.label_names)?;
        Ok(family
            .children
            .get(&values)
            .map(|s| s.value().snapshot(&family.opts.buckets)))
    }

    /// Snapshot of the unlabeled series plus every child, children sorted by
    /// label values.
    pub fn family_snapshot(&self) -> FamilySnapshot {
        let family = &self.inner;
        let mut children: Vec<(Vec<String>, HistogramSnapshot)> = family
            .children
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot(&family.opts.buckets)))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        FamilySnapshot {
            name: family.opts.name.clone(),
            help: family.opts.help.clone(),
            label_names: family.opts.label_names.clone(),
            unlabeled: self.snapshot(),
            series: children
                .into_iter()
                .map(|(values, snap)| {
                    (LabelSet::from_resolved(&family.opts.label_names, &values), snap)
                })
                .collect(),
        }
    }
}

/// One labeled series of a histogram.
#[derive(Debug, Clone)]
pub struct HistogramChild {
    family: Arc<Family>,
    series: Arc<Series>,
}

impl HistogramChild {
    pub fn observe(&self, value: f64) -> Result<()> {
        self.family.check_value(value)?;
        self.series.observe(&self.family.opts.buckets, value);
        Ok(())
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.series.snapshot(&self.family.opts.buckets)
    }
}

/// Whether `name` is usable as a metric name (or a prefix of one).
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_metric_name(name: &str) -> Result<()> {
    if !is_valid_metric_name(name) {
        return Err(MetricsError::InvalidName(format!(
            "metric name {name:?} must match [a-zA-Z_:][a-zA-Z0-9_:]*"
        )));
    }
    Ok(())
}

fn validate_label_names(metric: &str, names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if !is_valid_label_name(name) {
            return Err(MetricsError::InvalidName(format!(
                "label name {name:?} on {metric} must match [a-zA-Z_][a-zA-Z0-9_]*"
            )));
        }
        if name.starts_with("__") {
            return Err(MetricsError::InvalidName(format!(
                "label name {name:?} on {metric} uses the reserved __ prefix"
            )));
        }
        if name == RESERVED_LABEL {
            return Err(MetricsError::InvalidName(format!(
                "label name {name:?} on {metric} is reserved for histograms"
            )));
        }
        if names[..i].contains(name) {
            return Err(MetricsError::InvalidName(format!(
                "duplicate label name {name:?} on {metric}"
            )));
        }
    }
    Ok(())
}

/// Validate bucket upper bounds and return them without a trailing `+Inf`.
pub fn validate_buckets(buckets: &[f64]) -> Result<Vec<f64>> {
    let mut bounds = buckets.to_vec();
    if bounds.last() == Some(&f64::INFINITY) {
        bounds.pop();
    }
    if bounds.is_empty() {
        return Err(MetricsError::InvalidBuckets(
            "at least one finite bucket is required".into(),
        ));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::InvalidBuckets(format!(
            "bucket bound {b} is not finite"
        )));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(MetricsError::InvalidBuckets(format!(
            "buckets must be strictly increasing ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(bounds)
}
