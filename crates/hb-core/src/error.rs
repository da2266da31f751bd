//! # AppError
//!
//! Centralized error handling for the Hallboard ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all hb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, Comment)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., missing required field)
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad notice password or admin token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Target exists but is not in a state that permits the operation
    /// (e.g., liking an unaccepted post)
    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    /// Unique key already taken (e.g., duplicate notice post ID)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Conditional-write retry budget exhausted; safe for the client to retry
    #[error("concurrency budget exhausted: {0}")]
    ConcurrencyExhausted(String),

    /// Upstream service failure (laundry proxy)
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// Infrastructure failure (store connectivity, serialization)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("document (de)serialization failed: {err}"))
    }
}

/// A specialized Result type for Hallboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
