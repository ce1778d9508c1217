//! Typed label sets.
//!
//! A `LabelSet` is an explicit key -> value mapping. Keys are kept sorted so two
//! sets with the same pairs compare equal regardless of insertion order; the
//! histogram's declared label order is applied only when a set is resolved.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{MetricsError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a pair, returning the previous value for `key` if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Return the label values in `label_names` order.
    ///
    /// The key set must match `label_names` exactly: no missing and no extra
    /// keys.
    pub fn resolve(&self, metric: &str, label_names: &[String]) -> Result<Vec<String>> {
        let mismatch = || MetricsError::LabelMismatch {
            metric: metric.to_string(),
            expected: label_names.to_vec(),
            got: self.keys(),
        };

        if self.0.len() != label_names.len() {
            return Err(mismatch());
        }
        label_names
            .iter()
            .map(|name| self.0.get(name).cloned().ok_or_else(mismatch))
            .collect()
    }

    /// Rebuild a set from declared names and resolved values.
    pub(crate) fn from_resolved(label_names: &[String], values: &[String]) -> Self {
        label_names
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for LabelSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
