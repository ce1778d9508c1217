//! dnmetrics core: the histogram primitive, typed label sets, and the error
//! surface shared by the registry and its callers.
//!
//! This crate plays the role of the metrics backend. It knows nothing about
//! namespaces or handles; it only constructs named histograms, resolves label
//! sets into series, and records observations with atomics so concurrent
//! writers never lose updates.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `MetricsError`/`Result` so a bad metric call
//! never takes down the workload it is measuring.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod histogram;
pub mod labels;

/// Error surface and shared result type.
pub use error::{ErrorCode, MetricsError, Result};
pub use histogram::{
    FamilySnapshot, Histogram, HistogramChild, HistogramOpts, HistogramSnapshot, DEFAULT_BUCKETS,
};
pub use labels::LabelSet;
