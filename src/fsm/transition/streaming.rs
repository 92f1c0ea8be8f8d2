//! RUN, PULL, and DISCARD transitions.
//!
//! RUN only starts execution; its outcome, including any execution error,
//! surfaces through the subsequent PULL or DISCARD. Exhausting a stream in
//! AUTO_COMMIT closes the implicit transaction and returns to READY;
//! inside an explicit transaction the session stays in IN_TRANSACTION.

use futures::future::BoxFuture;
use serde_json::json;

use super::{ExecutionContext, StateTransition, TransitionError, TransitionOutcome};
use crate::fsm::SessionState;
use crate::protocol::{RequestMessage, ResponseSink};

/// Next state after touching a stream, given where the stream lives.
fn streaming_state(ctx: &ExecutionContext, has_more: bool) -> SessionState {
    match ctx.current_state() {
        SessionState::InTransaction => SessionState::InTransaction,
        _ if has_more => SessionState::AutoCommit,
        _ => SessionState::Ready,
    }
}

/// RUN: begins query execution and allocates the result stream.
pub struct RunTransition;

impl StateTransition for RunTransition {
    fn name(&self) -> &'static str {
        "run"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Run { query, parameters } = message else {
                return Err(TransitionError::Fatal(format!(
                    "run dispatched with {}",
                    message.message_type()
                )));
            };
            tracing::debug!(connection = %ctx.connection().id(), %query, "run");

            // A new RUN supersedes any stream the client abandoned; the old
            // handle must be cancelled or the engine never reclaims it.
            ctx.cancel_active_query().await?;

            let handle = ctx.connection().engine().begin_query(query, parameters).await?;
            ctx.set_active_query(handle);
            sink.on_metadata("qid", json!(handle.id()));

            let next = if ctx.current_state() == SessionState::InTransaction {
                SessionState::InTransaction
            } else {
                SessionState::AutoCommit
            };
            Ok(TransitionOutcome::Success(next))
        })
    }
}

/// PULL: drains result rows into the response sink.
pub struct PullTransition;

impl StateTransition for PullTransition {
    fn name(&self) -> &'static str {
        "pull"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Pull { n } = message else {
                return Err(TransitionError::Fatal(format!(
                    "pull dispatched with {}",
                    message.message_type()
                )));
            };
            let handle = ctx.active_query().ok_or_else(|| TransitionError::Execution {
                code: "Graphwire.Request.NoStream".to_string(),
                message: "No result stream is open".to_string(),
            })?;

            let n = ctx.fetch_size(*n);
            let result = ctx.connection().engine().pull(handle, n).await?;
            for record in result.records {
                sink.on_record(record);
            }

            if result.has_more {
                sink.on_metadata("has_more", json!(true));
            } else {
                ctx.clear_active_query();
            }
            Ok(TransitionOutcome::Success(streaming_state(
                ctx,
                result.has_more,
            )))
        })
    }
}

/// DISCARD: drops result rows without producing them.
pub struct DiscardTransition;

impl StateTransition for DiscardTransition {
    fn name(&self) -> &'static str {
        "discard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Discard { n } = message else {
                return Err(TransitionError::Fatal(format!(
                    "discard dispatched with {}",
                    message.message_type()
                )));
            };
            let handle = ctx.active_query().ok_or_else(|| TransitionError::Execution {
                code: "Graphwire.Request.NoStream".to_string(),
                message: "No result stream is open".to_string(),
            })?;

            let n = ctx.fetch_size(*n);
            let summary = ctx.connection().engine().discard(handle, n).await?;

            if summary.has_more {
                sink.on_metadata("has_more", json!(true));
            } else {
                ctx.clear_active_query();
            }
            Ok(TransitionOutcome::Success(streaming_state(
                ctx,
                summary.has_more,
            )))
        })
    }
}
