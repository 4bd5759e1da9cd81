//! Common error types for quaver

use thiserror::Error;

/// Common result type for quaver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across both quaver processes
#[derive(Error, Debug)]
pub enum Error {
    /// Queue storage error (wraps sqlx::Error); transient from the caller's
    /// point of view and safe to retry
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge transport error (wraps redis::RedisError)
    #[error("Bridge transport error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Wire encode/decode error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user command or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Source resolution failure
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Playback engine command failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// A bounded external call did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),
}
