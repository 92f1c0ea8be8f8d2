//! RESET recovery and administrative no-ops.

use futures::future::BoxFuture;

use super::{ExecutionContext, StateTransition, TransitionError, TransitionOutcome};
use crate::protocol::{RequestMessage, ResponseSink};

/// RESET: the only way out of FAILED or INTERRUPTED.
///
/// Cancels in-flight engine work and awaits its acknowledgement, clears the
/// interrupt signal, and returns the session to its recorded default state.
/// An open transaction survives only when BEGIN pinned the default state to
/// IN_TRANSACTION; otherwise it is rolled back. A RESET that cannot stop
/// engine work leaves the connection unusable, so those failures are fatal
/// rather than FAILED-recoverable.
pub struct ResetTransition;

impl StateTransition for ResetTransition {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Reset) {
                return Err(TransitionError::Fatal(format!(
                    "reset dispatched with {}",
                    message.message_type()
                )));
            }
            tracing::debug!(
                connection = %ctx.connection().id(),
                default = %ctx.default_state(),
                "reset"
            );

            ctx.cancel_active_query()
                .await
                .map_err(|err| TransitionError::Fatal(format!("reset failed to cancel: {err}")))?;

            // When BEGIN pinned the default state, the reset returns the
            // client to the live transaction; otherwise the transaction is
            // discarded.
            if ctx.default_state() != crate::fsm::SessionState::InTransaction {
                ctx.rollback_open_transaction().await.map_err(|err| {
                    TransitionError::Fatal(format!("reset failed to roll back: {err}"))
                })?;
            }
            ctx.interrupt().clear();

            Ok(TransitionOutcome::Success(ctx.default_state()))
        })
    }
}

/// TELEMETRY: driver usage marker, acknowledged without any session effect.
pub struct TelemetryTransition;

impl StateTransition for TelemetryTransition {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Telemetry { api } = message else {
                return Err(TransitionError::Fatal(format!(
                    "telemetry dispatched with {}",
                    message.message_type()
                )));
            };
            tracing::debug!(connection = %ctx.connection().id(), api, "telemetry");
            Ok(TransitionOutcome::Success(ctx.current_state()))
        })
    }
}
