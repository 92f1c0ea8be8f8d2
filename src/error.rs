//! Crate-level error types.
//!
//! Two error layers exist below this one and are deliberately kept separate:
//!
//! - [`TransitionError`](crate::fsm::transition::TransitionError) — raised by
//!   transition handlers during dispatch and absorbed by the state machine,
//!   which converts it into a structured failure response.
//! - [`EngineError`](crate::engine::EngineError) — raised by the execution
//!   engine boundary and converted into a transition failure.
//!
//! [`GraphwireError`] is what escapes to the embedding server: configuration
//! problems, unsupported protocol versions, and connections that have become
//! unusable and must be torn down.

use thiserror::Error;

use crate::protocol::ProtocolVersion;

/// Errors surfaced to the embedding connection layer.
#[derive(Error, Debug)]
pub enum GraphwireError {
    /// The negotiated protocol version has no transition table.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(ProtocolVersion),

    /// The connection is no longer usable and must be torn down.
    ///
    /// Raised when a transition fails in a way the state machine cannot
    /// recover from defensively, or when a message arrives for a session
    /// that has already reached its terminal state.
    #[error("connection is defunct: {0}")]
    Defunct(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for graphwire operations.
pub type Result<T> = std::result::Result<T, GraphwireError>;

impl From<toml::de::Error> for GraphwireError {
    fn from(err: toml::de::Error) -> Self {
        GraphwireError::Config(err.to_string())
    }
}
