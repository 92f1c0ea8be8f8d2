//! Transition handlers.
//!
//! One handler exists per accepted message type per protocol-version
//! variant. Handlers are stateless singletons shared across every
//! connection; all mutation flows through the [`ExecutionContext`]
//! parameter, never through handler-owned fields.

pub mod authentication;
pub mod recovery;
pub mod streaming;
pub mod transaction;

use futures::future::BoxFuture;
use thiserror::Error;

use super::context::ExecutionContext;
use super::state::SessionState;
use crate::engine::EngineError;
use crate::protocol::{RequestMessage, ResponseSink};

/// Result of a successfully executed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Move to the state and complete the exchange with a success response.
    Success(SessionState),
    /// Move to the state without sending any response (GOODBYE).
    Silent(SessionState),
}

/// A failed transition, absorbed by the state machine and converted into a
/// structured failure response plus a forced state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Credentials rejected; the session stays in AUTHENTICATION and the
    /// client may retry.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Execution-level failure; the session moves to FAILED and requires a
    /// RESET before continuing.
    #[error("{message}")]
    Execution {
        /// Stable machine-readable code.
        code: String,
        /// User-facing description.
        message: String,
    },

    /// The connection cannot be recovered; it is forced to DEFUNCT and
    /// torn down.
    #[error("{0}")]
    Fatal(String),
}

impl From<EngineError> for TransitionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation { code, message } => Self::Execution { code, message },
            EngineError::Execution(message) => Self::Execution {
                code: "Graphwire.Statement.ExecutionFailed".to_string(),
                message,
            },
            EngineError::Fatal(message) => Self::Fatal(message),
        }
    }
}

/// The unit of logic that validates and executes one message type's effect
/// on the session.
///
/// Implementations must be side-effect-free with respect to any state other
/// than the passed context, the sink, and the external collaborators the
/// context exposes.
pub trait StateTransition: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &'static str;

    /// Execute the transition against the context, emitting records and
    /// metadata into the sink, and produce the next state.
    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>>;
}
