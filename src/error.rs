//! Error handling for goldtrack
//!
//! Defines the typed failure kinds surfaced by the core and establishes a
//! unified Result type using anyhow for context chaining. Callers that need
//! to branch on a failure kind recover it with `downcast_ref::<TrackerError>()`.

use thiserror::Error;

/// Core error types for ledger, goal, zakat and pricing operations
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Find the typed kind anywhere in an anyhow error chain
    pub fn kind_of(err: &anyhow::Error) -> Option<&TrackerError> {
        err.chain().find_map(|e| e.downcast_ref::<TrackerError>())
    }
}

/// Result type alias for goldtrack operations
pub type Result<T> = anyhow::Result<T>;
