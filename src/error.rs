//! Crate-wide error type
//!
//! Only configuration and settings loading can fail. Stepping a configured
//! engine is infallible.

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected power or settings value
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed settings JSON
    #[error("failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }
}
