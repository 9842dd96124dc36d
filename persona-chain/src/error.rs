//! Error types for the host adapter.

use persona_core::PersonaError;
use thiserror::Error;

/// Errors raised by the host adapter itself.
///
/// Engine failures inside a transaction are not errors here: they become
/// reverted receipts. These variants cover setup, queries and I/O.
#[derive(Error, Debug)]
pub enum ChainError {
    /// An engine call outside a transaction failed (queries, deployment).
    #[error(transparent)]
    Persona(#[from] PersonaError),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A genesis entry was rejected.
    #[error("Genesis error: {0}")]
    Genesis(String),

    /// The log subscriber could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ChainError>;
