//! Common error types for nocturn

use thiserror::Error;

/// Common result type for nocturn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error types shared across the nocturn tools.
///
/// Recoverable per-item conditions (bad directory names, unresolvable clip
/// times, store add failures) are carried as module-local error values and
/// aggregated into counters instead; only setup-level failures use this type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
