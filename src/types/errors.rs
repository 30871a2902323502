//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use crate::store::StoreError;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the tool router.
#[derive(Error, Debug)]
pub enum Error {
    /// No tool supports the capability for the tenant (map to HTTP 422).
    #[error("no candidate tools for capability '{capability}' (tenant {tenant_id})")]
    NoCandidates {
        tenant_id: String,
        capability: String,
    },

    /// Collaborator failure (registry, metrics store, plan store), passed through as-is.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Validation errors (map to HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (map to HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Internal errors (map to HTTP 500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status the transport layer should surface for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::NoCandidates { .. } => 422,
            Error::Store(_) => 503,
            Error::Config(_) | Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoCandidates { .. } => "no_candidates",
            Error::Store(_) => "collaborator_failure",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn no_candidates(tenant_id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::NoCandidates {
            tenant_id: tenant_id.into(),
            capability: capability.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidates_is_distinct_from_validation() {
        let err = Error::no_candidates("acme", "patient.search");
        assert_eq!(err.code(), "no_candidates");
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("patient.search"));

        let err = Error::validation("tenant_id cannot be empty");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_store_error_message_passes_through() {
        let err: Error = StoreError::unavailable("registry down").into();
        assert_eq!(err.to_string(), StoreError::unavailable("registry down").to_string());
        assert_eq!(err.status_code(), 503);
    }
}
