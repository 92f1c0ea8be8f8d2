//! The session state machine.
//!
//! One [`StateMachine`] governs one client connection. Message dispatch is
//! strictly sequential: a message is fully processed, including any state
//! mutation, before the next is accepted. The machine itself is
//! version-agnostic; the [`TransitionTable`] chosen at handshake time is the
//! single source of truth for which transitions are legal.
//!
//! ```text
//!                  HELLO                LOGON(ok)
//!   [CONNECTED] ─────────> [AUTHENTICATION] ─────────> [READY]
//!                                ^                      │   │
//!                                │ LOGOFF          RUN  │   │ BEGIN
//!                                │                      v   v
//!                            [READY etc.]    [AUTO_COMMIT] [IN_TRANSACTION]
//!                                                  │             │
//!                                       PULL/DISCARD (done)      │ COMMIT/ROLLBACK
//!                                                  v             v
//!                                               [READY] <────────┘
//!
//!   any failure ──> [FAILED] ──RESET──> default state
//!   interrupt   ──> [INTERRUPTED] ──RESET──> default state
//!   GOODBYE     ──> [DEFUNCT] (terminal)
//! ```

pub mod context;
pub mod state;
pub mod table;
pub mod transition;

pub use context::{ConnectionHandle, ExecutionContext, InterruptSignal};
pub use state::SessionState;
pub use table::TransitionTable;

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{GraphwireError, Result};
use crate::protocol::{Failure, MessageType, ProtocolVersion, RequestMessage, ResponseSink};
use transition::{TransitionError, TransitionOutcome};

/// Orchestrates message dispatch for one connection.
pub struct StateMachine {
    table: Arc<TransitionTable>,
    ctx: ExecutionContext,
}

impl StateMachine {
    /// Create a machine using a table the handshake layer already built.
    pub fn new(table: Arc<TransitionTable>, connection: ConnectionHandle, config: SessionConfig) -> Self {
        Self {
            table,
            ctx: ExecutionContext::new(connection, config),
        }
    }

    /// Create a machine for a negotiated version, building its table.
    pub fn for_version(
        version: ProtocolVersion,
        connection: ConnectionHandle,
        config: SessionConfig,
    ) -> Result<Self> {
        let table = Arc::new(TransitionTable::for_version(version)?);
        Ok(Self::new(table, connection, config))
    }

    /// The session's current state.
    pub fn state(&self) -> SessionState {
        self.ctx.current_state()
    }

    /// The negotiated protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.table.version()
    }

    /// The per-connection execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// A clonable interrupt handle for out-of-band cancellation delivery.
    pub fn interrupt_signal(&self) -> InterruptSignal {
        self.ctx.interrupt_signal()
    }

    /// Process one message, writing its outcome to the sink.
    ///
    /// Every recoverable failure is absorbed here and reported through the
    /// sink; `Err` means the connection is unusable and must be torn down.
    pub async fn process(
        &mut self,
        message: &RequestMessage,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        let state = self.ctx.current_state();
        if state.is_terminal() {
            return Err(GraphwireError::Defunct(
                "message received after session termination".to_string(),
            ));
        }

        let message_type = message.message_type();

        // The interrupt signal is read once per message, never mid-handler.
        if self.ctx.interrupt().is_set() && message_type != MessageType::Reset {
            tracing::debug!(
                connection = %self.ctx.connection().id(),
                %message_type,
                "ignored during interrupt recovery"
            );
            self.ctx.set_current_state(SessionState::Interrupted);
            sink.on_ignored();
            return Ok(());
        }

        let Some(handler) = self.table.lookup(state, message_type) else {
            let failure = Failure::illegal_transition(state, message_type);
            tracing::warn!(
                connection = %self.ctx.connection().id(),
                %state,
                %message_type,
                "unsupported transition"
            );
            sink.on_failure(&failure);
            self.ctx.set_current_state(SessionState::Failed);
            return Ok(());
        };

        match handler.process(&mut self.ctx, message, sink).await {
            Ok(TransitionOutcome::Success(next)) => {
                sink.on_success();
                self.transition_to(next);
                Ok(())
            }
            Ok(TransitionOutcome::Silent(next)) => {
                self.transition_to(next);
                Ok(())
            }
            Err(TransitionError::Authentication(message)) => {
                sink.on_failure(&Failure::authentication(message));
                self.transition_to(SessionState::Authentication);
                Ok(())
            }
            Err(TransitionError::Execution { code, message }) => {
                sink.on_failure(&Failure::execution(code, message));
                self.transition_to(SessionState::Failed);
                Ok(())
            }
            Err(TransitionError::Fatal(message)) => {
                sink.on_failure(&Failure::fatal(message.clone()));
                self.transition_to(SessionState::Defunct);
                Err(GraphwireError::Defunct(message))
            }
        }
    }

    /// Tear the session down outside the message flow (connection dropped).
    ///
    /// Best effort: pending work is cancelled and the open transaction
    /// rolled back, then the session is forced to its terminal state.
    pub async fn close(&mut self) {
        if let Err(err) = self.ctx.cancel_active_query().await {
            tracing::warn!(connection = %self.ctx.connection().id(), %err, "cancel during close");
        }
        if let Err(err) = self.ctx.rollback_open_transaction().await {
            tracing::warn!(connection = %self.ctx.connection().id(), %err, "rollback during close");
        }
        self.ctx.connection_mut().logoff();
        self.transition_to(SessionState::Defunct);
    }

    fn transition_to(&mut self, next: SessionState) {
        let from = self.ctx.current_state();
        if from != next {
            tracing::debug!(
                connection = %self.ctx.connection().id(),
                %from,
                to = %next,
                "transition"
            );
        }
        self.ctx.set_current_state(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InMemoryEngine, StaticAuthenticator};
    use crate::protocol::{Credentials, FailureKind, ResponseRecorder};

    fn machine(version: ProtocolVersion) -> StateMachine {
        let auth = Arc::new(StaticAuthenticator::new().with_user("alice", "s3cret"));
        let engine = Arc::new(InMemoryEngine::new());
        StateMachine::for_version(
            version,
            ConnectionHandle::new(auth, engine),
            SessionConfig::default(),
        )
        .unwrap()
    }

    /// A representative message of each type, for table sweeps.
    fn sample(message_type: MessageType) -> RequestMessage {
        match message_type {
            MessageType::Hello => RequestMessage::hello("sweep/1.0"),
            MessageType::Logon => RequestMessage::logon(Credentials::basic("alice", "s3cret")),
            MessageType::Logoff => RequestMessage::Logoff,
            MessageType::Goodbye => RequestMessage::Goodbye,
            MessageType::Run => RequestMessage::run("RETURN 1"),
            MessageType::Pull => RequestMessage::pull_all(),
            MessageType::Discard => RequestMessage::Discard { n: Some(-1) },
            MessageType::Begin => RequestMessage::Begin,
            MessageType::Commit => RequestMessage::Commit,
            MessageType::Rollback => RequestMessage::Rollback,
            MessageType::Reset => RequestMessage::Reset,
            MessageType::Telemetry => RequestMessage::Telemetry { api: 0 },
        }
    }

    const ALL_MESSAGE_TYPES: [MessageType; 12] = [
        MessageType::Hello,
        MessageType::Logon,
        MessageType::Logoff,
        MessageType::Goodbye,
        MessageType::Run,
        MessageType::Pull,
        MessageType::Discard,
        MessageType::Begin,
        MessageType::Commit,
        MessageType::Rollback,
        MessageType::Reset,
        MessageType::Telemetry,
    ];

    #[tokio::test]
    async fn test_every_unregistered_pair_forces_failed() {
        for version in ProtocolVersion::SUPPORTED {
            for state in SessionState::ALL {
                if state.is_terminal() {
                    continue;
                }
                for message_type in ALL_MESSAGE_TYPES {
                    let mut fsm = machine(version);
                    if fsm.table.contains(state, message_type) {
                        continue;
                    }
                    fsm.ctx.set_current_state(state);

                    let mut recorder = ResponseRecorder::new();
                    fsm.process(&sample(message_type), &mut recorder)
                        .await
                        .unwrap();

                    let response = recorder.next().unwrap();
                    let failure = response.failure().unwrap_or_else(|| {
                        panic!("{message_type} in {state} on {version} did not fail")
                    });
                    assert_eq!(failure.kind, FailureKind::IllegalTransition);
                    assert_eq!(fsm.state(), SessionState::Failed);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_interrupt_suppresses_everything_but_reset() {
        let mut fsm = machine(ProtocolVersion::V1_1);
        let mut recorder = ResponseRecorder::new();

        fsm.process(&RequestMessage::hello("t/1.0"), &mut recorder)
            .await
            .unwrap();
        fsm.process(
            &RequestMessage::logon(Credentials::basic("alice", "s3cret")),
            &mut recorder,
        )
        .await
        .unwrap();
        assert_eq!(fsm.state(), SessionState::Ready);

        let signal = fsm.interrupt_signal();
        signal.set();

        for message in [
            RequestMessage::run("RETURN 1"),
            RequestMessage::Begin,
            RequestMessage::Goodbye,
        ] {
            let mut recorder = ResponseRecorder::new();
            fsm.process(&message, &mut recorder).await.unwrap();
            assert_eq!(
                recorder.next().unwrap().outcome,
                crate::protocol::Outcome::Ignored
            );
            assert_eq!(fsm.state(), SessionState::Interrupted);
        }

        let mut recorder = ResponseRecorder::new();
        fsm.process(&RequestMessage::Reset, &mut recorder).await.unwrap();
        assert!(recorder.next().unwrap().is_success());
        assert!(!signal.is_set());
        assert_eq!(fsm.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_goodbye_is_silent_and_terminal() {
        let mut fsm = machine(ProtocolVersion::V1_1);
        let mut recorder = ResponseRecorder::new();

        fsm.process(&RequestMessage::hello("t/1.0"), &mut recorder)
            .await
            .unwrap();
        recorder.next().unwrap();

        fsm.process(&RequestMessage::Goodbye, &mut recorder)
            .await
            .unwrap();
        assert!(recorder.is_empty(), "GOODBYE must not produce a response");
        assert_eq!(fsm.state(), SessionState::Defunct);

        let err = fsm
            .process(&RequestMessage::Reset, &mut recorder)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphwireError::Defunct(_)));
    }

    #[tokio::test]
    async fn test_close_forces_defunct() {
        let mut fsm = machine(ProtocolVersion::V1_0);
        fsm.close().await;
        assert_eq!(fsm.state(), SessionState::Defunct);
        assert!(!fsm.context().connection().is_authenticated());
    }
}
