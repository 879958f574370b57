//! Error types for configuration operations.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field {section}.{field}: {reason}")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Configuration document could not be decoded.
    #[error("failed to parse configuration document")]
    Parse {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// Configuration file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: impl Into<Option<String>>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: value.into(),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
