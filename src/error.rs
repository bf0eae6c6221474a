//! Error types for the feedback triage pipeline
//!
//! Structured error definitions using thiserror. Transient model-call
//! failures never surface through this type to classifier callers; they
//! degrade to a sentinel classification instead.

use thiserror::Error;

/// Main error type for triage operations
#[derive(Error, Debug)]
pub enum TriageError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Model API returned a non-success status
    #[error("Model API error: {0}")]
    ModelApi(String),

    /// Network-level failure talking to the model API
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid or missing API credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Model API rate limit hit
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Feedback record not found
    #[error("Feedback item not found: {0}")]
    NotFound(i64),

    /// Input failed validation at the ingress boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

impl From<libsql::Error> for TriageError {
    fn from(err: libsql::Error) -> Self {
        TriageError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            TriageError::Network(err.to_string())
        } else {
            TriageError::ModelApi(err.to_string())
        }
    }
}
