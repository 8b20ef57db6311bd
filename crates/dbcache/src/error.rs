//! Cache error types

use std::time::Duration;

use thiserror::Error;

/// Opaque error produced by handle factories and handles.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key: key must not be empty")]
    InvalidKey,

    #[error("Failed to open handle for {key}: {source}")]
    Creation {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to close handle for {key}: {source}")]
    Close {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Timed out after {0:?} waiting for sweeper to stop")]
    ShutdownTimeout(Duration),

    #[error("Sweeper task failed: {0}")]
    SweeperFailed(String),

    #[error("Cache shutdown finished with {} error(s): {}", .0.len(), join_errors(.0))]
    Shutdown(Vec<CacheError>),

    #[error("Cache is shut down")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Whether this error is, or aggregates, a sweeper stop timeout.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        match self {
            Self::ShutdownTimeout(_) => true,
            Self::Shutdown(errors) => errors.iter().any(Self::timed_out),
            _ => false,
        }
    }

    /// Handle close failures carried by this error.
    #[must_use]
    pub fn close_failures(&self) -> Vec<&Self> {
        match self {
            Self::Close { .. } => vec![self],
            Self::Shutdown(errors) => errors.iter().flat_map(Self::close_failures).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_errors(errors: &[CacheError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
