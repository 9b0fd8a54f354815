//! Error types for the cognitive signature engine

use thiserror::Error;

/// Errors that can occur at the edges of the engine.
///
/// Signal computation itself is total; only configuration loading, replay
/// parsing and sinks can fail.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}
