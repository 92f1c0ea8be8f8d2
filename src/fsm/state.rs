//! Session states.

use serde::{Deserialize, Serialize};

/// A point in the protocol's state graph.
///
/// Pure value type; all behavior lives in the transition table and its
/// handlers. The set of states reachable on a given connection depends on
/// the negotiated protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Handshake complete, unauthenticated.
    Connected,
    /// Credentials required.
    Authentication,
    /// Authenticated and idle.
    Ready,
    /// Streaming results of an implicit transaction.
    AutoCommit,
    /// Explicit transaction open.
    InTransaction,
    /// Recovering from a client-initiated interrupt.
    Interrupted,
    /// Unrecoverable protocol-level error in the current exchange.
    Failed,
    /// Connection terminated. Terminal.
    Defunct,
}

impl SessionState {
    /// Every declared state, in graph order.
    pub const ALL: [SessionState; 8] = [
        Self::Connected,
        Self::Authentication,
        Self::Ready,
        Self::AutoCommit,
        Self::InTransaction,
        Self::Interrupted,
        Self::Failed,
        Self::Defunct,
    ];

    /// Whether no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        *self == Self::Defunct
    }

    /// Protocol-level state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Authentication => "AUTHENTICATION",
            Self::Ready => "READY",
            Self::AutoCommit => "AUTO_COMMIT",
            Self::InTransaction => "IN_TRANSACTION",
            Self::Interrupted => "INTERRUPTED",
            Self::Failed => "FAILED",
            Self::Defunct => "DEFUNCT",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_defunct_is_terminal() {
        let terminal: Vec<_> = SessionState::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&SessionState::Defunct]);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::AutoCommit.to_string(), "AUTO_COMMIT");
        assert_eq!(SessionState::InTransaction.name(), "IN_TRANSACTION");
    }
}
