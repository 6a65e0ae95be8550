//! Unified error handling for the poidata crate
//!
//! Each subsystem owns its own error enum. This module folds them into a
//! single [`Error`] so that the service façade and the binary can propagate
//! any of them with `?`, while still classifying failures for retry and
//! reporting decisions.
//!
//! # Architecture
//!
//! - [`PoiErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use poidata::error::{Error, ErrorCategory, PoiErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.category() == ErrorCategory::Job {
//!         tracing::error!(error = %err, "Scrape run did not succeed");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::apify::JobError;
pub use crate::geo::GeoError;
pub use crate::parser::ParseError;
pub use crate::query::QueryError;
pub use crate::storage::StorageError;

/// Common trait for poidata error types
pub trait PoiErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Remote API unreachable or answering with a bad status
    Network,
    /// Remote run reached a failing terminal state, or the local wait ended
    Job,
    /// Dataset or payload decoding errors
    Parsing,
    /// Cell computation and query geometry errors
    Geo,
    /// Persistence errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Job => "job",
            Self::Parsing => "parsing",
            Self::Geo => "geo",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the poidata crate
#[derive(Error, Debug)]
pub enum Error {
    /// Remote job client errors
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Dataset parse errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Cell computation and geometry validation errors
    #[error("Geo error: {0}")]
    Geo(#[from] GeoError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Query validation and execution errors
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PoiErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Job(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Query(QueryError::Storage(e)) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Parse(_)
            | Self::Geo(_)
            | Self::Query(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Job(e) => match e {
                JobError::Http(_) | JobError::Status { .. } | JobError::InvalidUrl(_) => {
                    ErrorCategory::Network
                }
                JobError::Decode(_) => ErrorCategory::Parsing,
                _ => ErrorCategory::Job,
            },
            Self::Parse(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Geo(_) | Self::Query(QueryError::Invalid(_)) => ErrorCategory::Geo,
            Self::Storage(_) | Self::Query(QueryError::Storage(_)) | Self::Io(_) => {
                ErrorCategory::Storage
            }
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let job_err = Error::Job(JobError::RunFailed {
            run_id: "r1".to_string(),
        });
        assert_eq!(job_err.category(), ErrorCategory::Job);

        let status_err = Error::Job(JobError::Status {
            status: 503,
            body: None,
        });
        assert_eq!(status_err.category(), ErrorCategory::Network);

        let geo_err = Error::Query(QueryError::Invalid(GeoError::EmptyCellSet));
        assert_eq!(geo_err.category(), ErrorCategory::Geo);
    }

    #[test]
    fn test_is_recoverable() {
        let status_err = Error::Job(JobError::Status {
            status: 503,
            body: None,
        });
        assert!(status_err.is_recoverable());

        let geo_err = Error::Geo(GeoError::InvalidCell {
            cell: "zz".to_string(),
        });
        assert!(!geo_err.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = GeoError::EmptyCellSet.into();
        assert!(matches!(unified, Error::Geo(_)));
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("Missing API key");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.category().as_str(), "config");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Something went wrong");
        assert_eq!(err.category(), ErrorCategory::Other);
    }
}
