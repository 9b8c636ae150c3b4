//! Layered error definitions
//!
//! Categorized by source: config / check / sink

use thiserror::Error;

/// Unified error type for configuration and sink plumbing
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink creation error
    #[error("sink '{sink_name}' creation error: {message}")]
    SinkCreation { sink_name: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink creation error
    pub fn sink_creation(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Hard failures raised by a sample checker.
///
/// A sample that simply does not match is not an error: it is reported as
/// [`Verdict::Rejected`](crate::Verdict::Rejected).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Caller handed over fewer bytes than one sample
    #[error("sample too short: expected {expected} bytes, got {actual}")]
    SampleTooShort { expected: usize, actual: usize },

    /// `synchronise` called with a zero lane stride
    #[error("check size zero: lane stride must be positive")]
    LaneStrideZero,

    /// Lane stride is not a multiple of the sample size
    #[error("lane stride {stride} is not a multiple of sample size {sample_size}")]
    MisalignedStride { stride: usize, sample_size: usize },

    /// No run of matching samples in the search window
    #[error("no sync run found after scanning {offset} bytes (last candidate: {last_candidate:?})")]
    SyncNotFound {
        offset: usize,
        last_candidate: Option<u64>,
    },
}

impl CheckError {
    /// Whether the error only means "try again with more data"
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SyncNotFound { .. })
    }
}
