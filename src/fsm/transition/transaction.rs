//! BEGIN, COMMIT, and ROLLBACK transitions.

use futures::future::BoxFuture;
use serde_json::json;

use super::{ExecutionContext, StateTransition, TransitionError, TransitionOutcome};
use crate::fsm::SessionState;
use crate::protocol::{RequestMessage, ResponseSink};

/// BEGIN: opens an explicit transaction.
///
/// Whether the session's default state is pinned to IN_TRANSACTION while the
/// transaction is open varies by protocol version, so the table registers
/// the matching variant rather than branching at runtime. Pinning means a
/// RESET mid-transaction returns the client to the live transaction;
/// without it, a RESET rolls the transaction back.
pub struct BeginTransition {
    pin_default: bool,
}

impl BeginTransition {
    /// BEGIN that pins the default state to IN_TRANSACTION.
    pub fn pinning() -> Self {
        Self { pin_default: true }
    }

    /// BEGIN that leaves the default state untouched.
    pub fn non_pinning() -> Self {
        Self { pin_default: false }
    }
}

impl StateTransition for BeginTransition {
    fn name(&self) -> &'static str {
        "begin"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Begin) {
                return Err(TransitionError::Fatal(format!(
                    "begin dispatched with {}",
                    message.message_type()
                )));
            }
            ctx.connection().engine().begin_transaction().await?;
            ctx.set_transaction_open(true);
            if self.pin_default {
                ctx.set_default_state(SessionState::InTransaction);
            }
            Ok(TransitionOutcome::Success(SessionState::InTransaction))
        })
    }
}

/// COMMIT: finalizes the open transaction and restores the READY default.
pub struct CommitTransition;

impl StateTransition for CommitTransition {
    fn name(&self) -> &'static str {
        "commit"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Commit) {
                return Err(TransitionError::Fatal(format!(
                    "commit dispatched with {}",
                    message.message_type()
                )));
            }
            ctx.cancel_active_query().await?;
            let bookmark = ctx.connection().engine().commit().await?;
            ctx.set_transaction_open(false);
            sink.on_metadata("bookmark", json!(bookmark));

            ctx.set_default_state(SessionState::Ready);
            Ok(TransitionOutcome::Success(SessionState::Ready))
        })
    }
}

/// ROLLBACK: aborts the open transaction and restores the READY default.
pub struct RollbackTransition;

impl StateTransition for RollbackTransition {
    fn name(&self) -> &'static str {
        "rollback"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Rollback) {
                return Err(TransitionError::Fatal(format!(
                    "rollback dispatched with {}",
                    message.message_type()
                )));
            }
            ctx.cancel_active_query().await?;
            ctx.connection().engine().rollback().await?;
            ctx.set_transaction_open(false);

            ctx.set_default_state(SessionState::Ready);
            Ok(TransitionOutcome::Success(SessionState::Ready))
        })
    }
}
