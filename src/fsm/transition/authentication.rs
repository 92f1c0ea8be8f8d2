//! HELLO, LOGON, LOGOFF, and GOODBYE transitions.

use futures::future::BoxFuture;
use serde_json::json;

use super::{ExecutionContext, StateTransition, TransitionError, TransitionOutcome};
use crate::fsm::SessionState;
use crate::protocol::{RequestMessage, ResponseSink};

fn wrong_message(handler: &dyn StateTransition, message: &RequestMessage) -> TransitionError {
    TransitionError::Fatal(format!(
        "{} dispatched with {}",
        handler.name(),
        message.message_type()
    ))
}

/// HELLO on versions with explicit authentication: opens the session and
/// parks it in AUTHENTICATION until a LOGON arrives.
pub struct HelloTransition;

impl StateTransition for HelloTransition {
    fn name(&self) -> &'static str {
        "hello"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Hello { user_agent, .. } = message else {
                return Err(wrong_message(self, message));
            };
            tracing::debug!(connection = %ctx.connection().id(), %user_agent, "hello");

            sink.on_metadata("server", json!(ctx.config().server_agent));
            sink.on_metadata("connection_id", json!(ctx.connection().id().to_string()));

            ctx.set_default_state(SessionState::Authentication);
            Ok(TransitionOutcome::Success(SessionState::Authentication))
        })
    }
}

/// HELLO on versions that authenticate inline: credentials travel with the
/// preamble and a failure tears the connection down, since these versions
/// have no retry state.
pub struct InlineHelloTransition;

impl StateTransition for InlineHelloTransition {
    fn name(&self) -> &'static str {
        "hello-inline-auth"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Hello {
                user_agent,
                credentials,
            } = message
            else {
                return Err(wrong_message(self, message));
            };
            tracing::debug!(connection = %ctx.connection().id(), %user_agent, "hello");

            let credentials = credentials
                .as_ref()
                .ok_or_else(|| TransitionError::Fatal("HELLO carried no credentials".to_string()))?;
            ctx.connection_mut()
                .logon(credentials)
                .await
                .map_err(|err| TransitionError::Fatal(err.0))?;

            sink.on_metadata("server", json!(ctx.config().server_agent));
            sink.on_metadata("connection_id", json!(ctx.connection().id().to_string()));

            ctx.set_default_state(SessionState::Ready);
            Ok(TransitionOutcome::Success(SessionState::Ready))
        })
    }
}

/// LOGON: validates credentials through the authentication provider.
/// Failures are recoverable; the session stays in AUTHENTICATION.
pub struct LogonTransition;

impl StateTransition for LogonTransition {
    fn name(&self) -> &'static str {
        "logon"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            let RequestMessage::Logon { credentials } = message else {
                return Err(wrong_message(self, message));
            };
            ctx.connection_mut()
                .logon(credentials)
                .await
                .map_err(|err| TransitionError::Authentication(err.0))?;

            ctx.set_default_state(SessionState::Ready);
            Ok(TransitionOutcome::Success(SessionState::Ready))
        })
    }
}

/// LOGOFF: de-authenticates for user switching. Cannot fail under normal
/// operation and always lands in AUTHENTICATION.
pub struct LogoffTransition;

impl StateTransition for LogoffTransition {
    fn name(&self) -> &'static str {
        "logoff"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Logoff) {
                return Err(wrong_message(self, message));
            }
            ctx.cancel_active_query().await?;
            ctx.rollback_open_transaction().await?;
            ctx.connection_mut().logoff();

            // Return the default state to AUTHENTICATION so a later RESET
            // cannot land the connection back in an authenticated state
            // while it holds no login context.
            ctx.set_default_state(SessionState::Authentication);
            Ok(TransitionOutcome::Success(SessionState::Authentication))
        })
    }
}

/// GOODBYE: graceful teardown from any non-terminal state. No response is
/// sent.
pub struct GoodbyeTransition;

impl StateTransition for GoodbyeTransition {
    fn name(&self) -> &'static str {
        "goodbye"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ExecutionContext,
        message: &'a RequestMessage,
        _sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<TransitionOutcome, TransitionError>> {
        Box::pin(async move {
            if !matches!(message, RequestMessage::Goodbye) {
                return Err(wrong_message(self, message));
            }
            tracing::debug!(connection = %ctx.connection().id(), "goodbye");

            // Best effort; the connection is going away either way.
            if let Err(err) = ctx.cancel_active_query().await {
                tracing::warn!(connection = %ctx.connection().id(), %err, "cancel during goodbye");
            }
            if let Err(err) = ctx.rollback_open_transaction().await {
                tracing::warn!(connection = %ctx.connection().id(), %err, "rollback during goodbye");
            }
            ctx.connection_mut().logoff();

            Ok(TransitionOutcome::Silent(SessionState::Defunct))
        })
    }
}
