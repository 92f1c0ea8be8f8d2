//! Per-version transition tables.
//!
//! The table is the single source of truth for "is message M legal in state
//! S". It is built once per negotiated protocol version and read-only
//! thereafter, so connections share it freely. No transition logic checks
//! versions at runtime; version differences exist only as different table
//! entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::state::SessionState;
use super::transition::authentication::{
    GoodbyeTransition, HelloTransition, InlineHelloTransition, LogoffTransition, LogonTransition,
};
use super::transition::recovery::{ResetTransition, TelemetryTransition};
use super::transition::streaming::{DiscardTransition, PullTransition, RunTransition};
use super::transition::transaction::{BeginTransition, CommitTransition, RollbackTransition};
use super::transition::StateTransition;
use crate::error::GraphwireError;
use crate::protocol::{MessageType, ProtocolVersion};

/// Read-only mapping from (state, message type) to the applicable handler.
pub struct TransitionTable {
    version: ProtocolVersion,
    entries: HashMap<(SessionState, MessageType), Arc<dyn StateTransition>>,
}

impl TransitionTable {
    /// Build the table for a negotiated version.
    pub fn for_version(version: ProtocolVersion) -> Result<Self, GraphwireError> {
        let mut builder = Builder::common();
        match version {
            ProtocolVersion::V1_0 => {
                builder
                    .on(
                        SessionState::Connected,
                        MessageType::Hello,
                        Arc::new(InlineHelloTransition),
                    )
                    .on(
                        SessionState::Ready,
                        MessageType::Begin,
                        Arc::new(BeginTransition::pinning()),
                    );
            }
            ProtocolVersion::V1_1 => {
                builder.explicit_authentication().on(
                    SessionState::Ready,
                    MessageType::Begin,
                    Arc::new(BeginTransition::pinning()),
                );
            }
            ProtocolVersion::V1_2 => {
                builder
                    .explicit_authentication()
                    .on(
                        SessionState::Ready,
                        MessageType::Begin,
                        Arc::new(BeginTransition::non_pinning()),
                    )
                    .on(
                        SessionState::Ready,
                        MessageType::Telemetry,
                        Arc::new(TelemetryTransition),
                    );
            }
            other => return Err(GraphwireError::UnsupportedVersion(other)),
        }
        Ok(Self {
            version,
            entries: builder.entries,
        })
    }

    /// The version this table was built for.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The handler for the pair, if the transition is legal.
    pub fn lookup(
        &self,
        state: SessionState,
        message_type: MessageType,
    ) -> Option<&Arc<dyn StateTransition>> {
        self.entries.get(&(state, message_type))
    }

    /// Whether the pair has a registered handler.
    pub fn contains(&self, state: SessionState, message_type: MessageType) -> bool {
        self.entries.contains_key(&(state, message_type))
    }
}

impl fmt::Debug for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("version", &self.version)
            .field("entries", &self.entries.len())
            .finish()
    }
}

struct Builder {
    entries: HashMap<(SessionState, MessageType), Arc<dyn StateTransition>>,
}

impl Builder {
    /// Entries shared by every supported version.
    fn common() -> Self {
        let mut builder = Self {
            entries: HashMap::new(),
        };

        // RESET and GOODBYE are legal from every non-terminal state.
        let reset: Arc<dyn StateTransition> = Arc::new(ResetTransition);
        let goodbye: Arc<dyn StateTransition> = Arc::new(GoodbyeTransition);
        for state in SessionState::ALL {
            if state.is_terminal() {
                continue;
            }
            builder.on(state, MessageType::Reset, Arc::clone(&reset));
            builder.on(state, MessageType::Goodbye, Arc::clone(&goodbye));
        }

        let run: Arc<dyn StateTransition> = Arc::new(RunTransition);
        let pull: Arc<dyn StateTransition> = Arc::new(PullTransition);
        let discard: Arc<dyn StateTransition> = Arc::new(DiscardTransition);

        builder.on(SessionState::Ready, MessageType::Run, Arc::clone(&run));
        builder.on(SessionState::AutoCommit, MessageType::Pull, Arc::clone(&pull));
        builder.on(
            SessionState::AutoCommit,
            MessageType::Discard,
            Arc::clone(&discard),
        );

        builder.on(SessionState::InTransaction, MessageType::Run, run);
        builder.on(SessionState::InTransaction, MessageType::Pull, pull);
        builder.on(SessionState::InTransaction, MessageType::Discard, discard);
        builder.on(
            SessionState::InTransaction,
            MessageType::Commit,
            Arc::new(CommitTransition),
        );
        builder.on(
            SessionState::InTransaction,
            MessageType::Rollback,
            Arc::new(RollbackTransition),
        );

        builder
    }

    /// Entries for versions with a separate AUTHENTICATION exchange:
    /// HELLO parks in AUTHENTICATION, LOGON authenticates, LOGOFF is legal
    /// from every authenticated state.
    fn explicit_authentication(&mut self) -> &mut Self {
        self.on(
            SessionState::Connected,
            MessageType::Hello,
            Arc::new(HelloTransition),
        );
        self.on(
            SessionState::Authentication,
            MessageType::Logon,
            Arc::new(LogonTransition),
        );

        let logoff: Arc<dyn StateTransition> = Arc::new(LogoffTransition);
        for state in [
            SessionState::Ready,
            SessionState::AutoCommit,
            SessionState::InTransaction,
        ] {
            self.on(state, MessageType::Logoff, Arc::clone(&logoff));
        }
        self
    }

    fn on(
        &mut self,
        state: SessionState,
        message_type: MessageType,
        handler: Arc<dyn StateTransition>,
    ) -> &mut Self {
        self.entries.insert((state, message_type), handler);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_rejected() {
        let err = TransitionTable::for_version(ProtocolVersion::new(9, 9)).unwrap_err();
        assert!(matches!(err, GraphwireError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_reset_and_goodbye_cover_non_terminal_states() {
        for version in ProtocolVersion::SUPPORTED {
            let table = TransitionTable::for_version(version).unwrap();
            for state in SessionState::ALL {
                assert_eq!(
                    table.contains(state, MessageType::Reset),
                    !state.is_terminal(),
                    "RESET registration wrong for {state} on {version}"
                );
                assert_eq!(
                    table.contains(state, MessageType::Goodbye),
                    !state.is_terminal(),
                    "GOODBYE registration wrong for {state} on {version}"
                );
            }
        }
    }

    #[test]
    fn test_debug_reports_version_and_size() {
        let table = TransitionTable::for_version(ProtocolVersion::V1_1).unwrap();
        let rendered = format!("{table:?}");
        assert!(rendered.contains("TransitionTable"));
        assert!(rendered.contains("version"));
        assert!(rendered.contains("entries"));
    }

    #[test]
    fn test_defunct_has_no_entries() {
        let table = TransitionTable::for_version(ProtocolVersion::V1_2).unwrap();
        for (state, _) in table.entries.keys() {
            assert_ne!(*state, SessionState::Defunct);
        }
    }

    #[test]
    fn test_logon_only_on_explicit_auth_versions() {
        let v1_0 = TransitionTable::for_version(ProtocolVersion::V1_0).unwrap();
        assert!(!v1_0.contains(SessionState::Authentication, MessageType::Logon));
        assert!(!v1_0.contains(SessionState::Ready, MessageType::Logoff));

        let v1_1 = TransitionTable::for_version(ProtocolVersion::V1_1).unwrap();
        assert!(v1_1.contains(SessionState::Authentication, MessageType::Logon));
        assert!(v1_1.contains(SessionState::Ready, MessageType::Logoff));
        assert!(v1_1.contains(SessionState::InTransaction, MessageType::Logoff));
    }

    #[test]
    fn test_telemetry_only_on_newest_version() {
        let v1_1 = TransitionTable::for_version(ProtocolVersion::V1_1).unwrap();
        assert!(!v1_1.contains(SessionState::Ready, MessageType::Telemetry));

        let v1_2 = TransitionTable::for_version(ProtocolVersion::V1_2).unwrap();
        assert!(v1_2.contains(SessionState::Ready, MessageType::Telemetry));
    }

    #[test]
    fn test_streaming_entries() {
        let table = TransitionTable::for_version(ProtocolVersion::V1_1).unwrap();
        assert!(table.contains(SessionState::Ready, MessageType::Run));
        assert!(table.contains(SessionState::AutoCommit, MessageType::Pull));
        assert!(table.contains(SessionState::InTransaction, MessageType::Run));
        assert!(table.contains(SessionState::InTransaction, MessageType::Commit));
        // RUN is not legal mid-stream in autocommit
        assert!(!table.contains(SessionState::AutoCommit, MessageType::Run));
        // COMMIT only applies to explicit transactions
        assert!(!table.contains(SessionState::Ready, MessageType::Commit));
    }
}
