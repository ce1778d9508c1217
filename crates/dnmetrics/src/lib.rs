//! Top-level facade crate for dnmetrics.
//!
//! Re-exports the histogram backend and the registry so users can depend on a single crate.

pub mod core {
    pub use dnmetrics_core::*;
}

pub mod registry {
    pub use dnmetrics_registry::*;
}
