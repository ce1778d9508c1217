//! Namespaced histogram registry.
//!
//! Maps `namespace + name` to exactly one `Histogram`. Lookups of existing
//! names take a shard read lock; the create-if-absent path goes through the
//! `DashMap` entry API, which holds the shard write lock across the check and
//! the insert so concurrent first calls for one name agree on a single
//! histogram. Entries are never removed.
//!
//! Under `MismatchPolicy::Warn` a conflicting label schema is logged once per
//! `(name, requested labels)` pair; repeats of the same conflict stay silent.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use dnmetrics_core::error::{MetricsError, Result};
use dnmetrics_core::histogram::{FamilySnapshot, Histogram, HistogramOpts};

use crate::config::{MismatchPolicy, RegistryConfig, RegistrySection};
use crate::handle::MetricHandle;

/// Registry shared across threads.
pub type SharedMetricRegistry = Arc<MetricRegistry>;

/// Build a registry from config and wrap it for sharing.
pub fn new_shared_registry(cfg: &RegistryConfig) -> Result<SharedMetricRegistry> {
    Ok(Arc::new(MetricRegistry::from_config(cfg)?))
}

#[derive(Debug)]
pub struct MetricRegistry {
    namespace: String,
    buckets: Vec<f64>,
    mismatch: MismatchPolicy,
    histograms: DashMap<String, Histogram>,
    reported_mismatches: DashSet<(String, Vec<String>)>,
}

impl MetricRegistry {
    /// Registry with the default namespace, buckets, and `warn` policy.
    pub fn new() -> Self {
        Self::from_section(RegistrySection::default())
    }

    pub fn from_config(cfg: &RegistryConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::from_section(cfg.registry.clone()))
    }

    fn from_section(section: RegistrySection) -> Self {
        Self {
            namespace: section.namespace,
            buckets: section.buckets,
            mismatch: section.schema_mismatch,
            histograms: DashMap::new(),
            reported_mismatches: DashSet::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn mismatch_policy(&self) -> MismatchPolicy {
        self.mismatch
    }

    /// Registry key for a caller-supplied name.
    pub fn fully_qualified(&self, name: &str) -> String {
        format!("{}{}", self.namespace, name)
    }

    /// Return a handle on the histogram registered under `name`, creating the
    /// histogram on first use.
    ///
    /// `description` and `label_names` only matter on the call that creates
    /// the histogram; later calls reuse it as is. A later call with different
    /// label names is logged, or rejected under `MismatchPolicy::Reject`.
    pub fn create_or_get_handle(
        &self,
        name: &str,
        description: &str,
        label_names: &[&str],
    ) -> Result<MetricHandle> {
        let histogram = self.get_or_register(name, description, label_names)?;
        Ok(MetricHandle::new(histogram))
    }

    fn get_or_register(
        &self,
        name: &str,
        description: &str,
        label_names: &[&str],
    ) -> Result<Histogram> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName("metric name must not be empty".into()));
        }
        let key = self.fully_qualified(name);
        let requested: Vec<String> = label_names.iter().map(|s| s.to_string()).collect();

        let existing = self.histograms.get(&key).map(|r| r.value().clone());
        if let Some(hist) = existing {
            self.check_schema(&hist, description, &requested)?;
            return Ok(hist);
        }

        let hist = match self.histograms.entry(key) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(v) => {
                let opts = HistogramOpts::new(v.key().clone(), description)
                    .label_names(requested)
                    .buckets(self.buckets.clone());
                let hist = Histogram::new(opts)?;
                tracing::debug!(
                    metric = %hist.name(),
                    labels = ?hist.label_names(),
                    "histogram registered"
                );
                v.insert(hist.clone());
                return Ok(hist);
            }
        };
        // Lost the race to another first caller.
        self.check_schema(&hist, description, &requested)?;
        Ok(hist)
    }

    fn check_schema(&self, hist: &Histogram, description: &str, requested: &[String]) -> Result<()> {
        if hist.label_names() != requested {
            match self.mismatch {
                MismatchPolicy::Warn => {
                    let first_report = self
                        .reported_mismatches
                        .insert((hist.name().to_string(), requested.to_vec()));
                    if first_report {
                        tracing::warn!(
                            metric = %hist.name(),
                            registered = ?hist.label_names(),
                            requested = ?requested,
                            "label names differ from first registration; keeping the first schema"
                        );
                    }
                }
                MismatchPolicy::Reject => {
                    return Err(MetricsError::SchemaConflict {
                        metric: hist.name().to_string(),
                        registered: hist.label_names().to_vec(),
                        requested: requested.to_vec(),
                    });
                }
            }
        }
        if hist.help() != description {
            tracing::debug!(metric = %hist.name(), "description differs from first registration");
        }
        Ok(())
    }

    /// Histogram registered under `name`, without creating one.
    pub fn get(&self, name: &str) -> Option<Histogram> {
        self.histograms
            .get(&self.fully_qualified(name))
            .map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Fully-qualified names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.histograms.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of every registered histogram, sorted by name.
    pub fn snapshot(&self) -> Vec<FamilySnapshot> {
        let mut out: Vec<FamilySnapshot> = self
            .histograms
            .iter()
            .map(|e| e.value().family_snapshot())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
