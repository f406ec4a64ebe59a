//! Error types for calsense operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration; the engine must not start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The calendar collaborator failed to deliver occurrences.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
