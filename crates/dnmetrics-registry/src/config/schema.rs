use serde::Deserialize;

use dnmetrics_core::error::{MetricsError, Result};
use dnmetrics_core::histogram::{is_valid_metric_name, validate_buckets, DEFAULT_BUCKETS};

/// Prefix applied to every metric name handed to the registry.
pub const DEFAULT_NAMESPACE: &str = "audius_dn_";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub version: u32,

    #[serde(default)]
    pub registry: RegistrySection,
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion(self.version));
        }

        self.registry.validate()?;

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            version: 1,
            registry: RegistrySection::default(),
        }
    }
}

/// What to do when a name is re-registered with a different label schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Keep the first registration and log a warning.
    #[default]
    Warn,
    /// Fail the call with `SchemaConflict`.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,

    #[serde(default)]
    pub schema_mismatch: MismatchPolicy,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            buckets: default_buckets(),
            schema_mismatch: MismatchPolicy::default(),
        }
    }
}

impl RegistrySection {
    pub fn validate(&self) -> Result<()> {
        // Empty namespace is allowed: names then reach the backend unprefixed.
        if !self.namespace.is_empty() && !is_valid_metric_name(&self.namespace) {
            return Err(MetricsError::BadConfig(format!(
                "registry.namespace {:?} must match [a-zA-Z_:][a-zA-Z0-9_:]*",
                self.namespace
            )));
        }
        validate_buckets(&self.buckets)
            .map_err(|e| MetricsError::BadConfig(format!("registry.buckets: {e}")))?;
        Ok(())
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}
fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
