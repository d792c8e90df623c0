//! Error types for trellis operations.

use thiserror::Error;

/// Result type alias for trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Errors surfaced by the primitives.
///
/// Most failure in this crate is reported as state (a resource's `error`
/// signal, a no-op undo) rather than through this type. What remains is
/// what a caller has to act on.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// A value could not be encoded for, or decoded from, the store.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A timer or task was requested outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong with it.
        message: String,
    },
}

impl TrellisError {
    /// Create an invalid configuration error.
    #[inline]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TrellisError::InvalidConfig {
            message: message.into(),
        }
    }
}
