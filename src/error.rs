//! Error types for queue engine and restriction authority operations.

use thiserror::Error;

/// Comprehensive error type for all engine and restriction operations
#[derive(Debug, Error)]
pub enum MultiQueueError {
    #[error("Duplicate message: uuid '{uuid}' already exists in sub-queue '{existing_sub_queue}'")]
    DuplicateMessage {
        uuid: String,
        existing_sub_queue: String,
    },

    #[error("Unable to update message '{uuid}': {message}")]
    MessageUpdateFailed { uuid: String, message: String },

    #[error("Unable to delete message '{uuid}': {message}")]
    MessageDeleteFailed { uuid: String, message: String },

    #[error("Illegal sub-queue identifier: '{sub_queue}' is reserved for internal use")]
    IllegalSubQueueIdentifier { sub_queue: String },

    #[error("Health check failed: {source:#}")]
    HealthCheckFailed { source: anyhow::Error },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not authorised to access sub-queue '{sub_queue}'")]
    AuthorisationFailed { sub_queue: String },

    #[error("Operation '{operation}' is not supported; use the sub-queue qualified variant")]
    UnsupportedOperation { operation: String },

    #[error("Storage error ({backend}): {message}")]
    Storage { backend: String, message: String },

    #[error("Validation error: {0}")]
    ValidationFailed(#[from] ValidationError),
}

impl MultiQueueError {
    /// Check if the error was caused by the caller rather than the storage layer.
    ///
    /// Client errors are never retried internally: a duplicate uuid or a
    /// reserved identifier will stay wrong no matter how often it is resent.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::DuplicateMessage { .. } => true,
            Self::MessageUpdateFailed { .. } => true,
            Self::MessageDeleteFailed { .. } => false,
            Self::IllegalSubQueueIdentifier { .. } => true,
            Self::HealthCheckFailed { .. } => false,
            Self::AuthenticationFailed { .. } => true,
            Self::AuthorisationFailed { .. } => true,
            Self::UnsupportedOperation { .. } => true,
            Self::Storage { .. } => false,
            Self::ValidationFailed(_) => true,
        }
    }

    /// Wrap an arbitrary backend probe failure, preserving the original cause.
    pub fn health_check(source: impl Into<anyhow::Error>) -> Self {
        Self::HealthCheckFailed {
            source: source.into(),
        }
    }
}

/// Validation errors for domain identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
