//! Registry config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use dnmetrics_core::error::{MetricsError, Result};

pub use schema::{MismatchPolicy, RegistryConfig, RegistrySection, DEFAULT_NAMESPACE};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<RegistryConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        MetricsError::BadConfig(format!("read config failed ({}): {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RegistryConfig> {
    let cfg: RegistryConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
