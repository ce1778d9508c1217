//! dnmetrics registry library entry.
//!
//! This crate wires the histogram backend from `dnmetrics-core` into a
//! namespaced, lazily-populated registry. Callers build one `MetricRegistry`
//! (usually from YAML config), share it by `Arc`, and take a short-lived
//! `MetricHandle` per measurement.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod handle;
pub mod registry;
pub mod telemetry;

pub use handle::MetricHandle;
pub use registry::{new_shared_registry, MetricRegistry, SharedMetricRegistry};
