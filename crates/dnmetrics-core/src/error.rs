//! Shared error type across dnmetrics crates.

use thiserror::Error;

/// Stable error codes, independent of message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Metric or label name rejected.
    InvalidName,
    /// Supplied label keys do not match the declared schema.
    LabelMismatch,
    /// Same metric name re-registered with a different label schema.
    SchemaConflict,
    /// Observation value rejected.
    InvalidValue,
    /// Bucket boundaries rejected.
    InvalidBuckets,
    /// Configuration could not be read or is invalid.
    BadConfig,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::LabelMismatch => "LABEL_MISMATCH",
            ErrorCode::SchemaConflict => "SCHEMA_CONFLICT",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("label mismatch for {metric}: expected {expected:?}, got {got:?}")]
    LabelMismatch {
        metric: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("schema conflict for {metric}: registered with {registered:?}, requested {requested:?}")]
    SchemaConflict {
        metric: String,
        registered: Vec<String>,
        requested: Vec<String>,
    },
    #[error("invalid value for {metric}: {value}")]
    InvalidValue { metric: String, value: f64 },
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::LabelMismatch { .. } => ErrorCode::LabelMismatch,
            MetricsError::SchemaConflict { .. } => ErrorCode::SchemaConflict,
            MetricsError::InvalidValue { .. } => ErrorCode::InvalidValue,
            MetricsError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            MetricsError::BadConfig(_) => ErrorCode::BadConfig,
            MetricsError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
