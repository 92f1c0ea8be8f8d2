//! Request messages accepted by the session state machine.
//!
//! Messages arrive fully decoded from the wire layer; this crate never
//! parses bytes. Each variant corresponds to one request type and is
//! immutable once constructed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters and response metadata.
pub type Params = serde_json::Map<String, Value>;

/// Credentials presented by a client during authentication.
///
/// Opaque to the state machine; only the authentication provider
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Authentication scheme (e.g. `basic`).
    pub scheme: String,
    /// Principal identifying the user.
    pub principal: String,
    /// Secret proving the principal's identity.
    pub secret: String,
}

impl Credentials {
    /// Basic principal/secret credentials.
    pub fn basic(principal: &str, secret: &str) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: principal.to_string(),
            secret: secret.to_string(),
        }
    }
}

/// Message types in the session protocol.
///
/// The type is the key half of every transition table entry; two messages
/// with the same type are always dispatched to the same handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Connection preamble, opens the session.
    Hello,
    /// Authenticate or switch users.
    Logon,
    /// Drop the current authenticated user.
    Logoff,
    /// Graceful connection shutdown.
    Goodbye,
    /// Execute a query.
    Run,
    /// Consume result rows.
    Pull,
    /// Drop result rows without consuming them.
    Discard,
    /// Open an explicit transaction.
    Begin,
    /// Commit the open transaction.
    Commit,
    /// Abort the open transaction.
    Rollback,
    /// Recover from failure or interrupt.
    Reset,
    /// Driver usage marker (newest version only).
    Telemetry,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Hello => "HELLO",
            Self::Logon => "LOGON",
            Self::Logoff => "LOGOFF",
            Self::Goodbye => "GOODBYE",
            Self::Run => "RUN",
            Self::Pull => "PULL",
            Self::Discard => "DISCARD",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
            Self::Reset => "RESET",
            Self::Telemetry => "TELEMETRY",
        };
        write!(f, "{name}")
    }
}

/// A decoded request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RequestMessage {
    /// Connection preamble. Carries credentials only on versions that
    /// authenticate inline.
    Hello {
        /// Client identification string.
        user_agent: String,
        /// Inline credentials (version 1.0 only).
        #[serde(skip_serializing_if = "Option::is_none")]
        credentials: Option<Credentials>,
    },
    /// Authenticate the connection.
    Logon {
        /// Credentials to validate.
        credentials: Credentials,
    },
    /// De-authenticate for user switching.
    Logoff,
    /// Graceful shutdown; no response is sent.
    Goodbye,
    /// Execute a query, autocommit-style or inside an open transaction.
    Run {
        /// Query text.
        query: String,
        /// Query parameters.
        #[serde(default)]
        parameters: Params,
    },
    /// Consume up to `n` result rows (`None` uses the configured default,
    /// `-1` consumes the remainder).
    Pull {
        /// Row count limit.
        n: Option<i64>,
    },
    /// Drop up to `n` result rows.
    Discard {
        /// Row count limit.
        n: Option<i64>,
    },
    /// Open an explicit transaction.
    Begin,
    /// Commit the open transaction.
    Commit,
    /// Abort the open transaction.
    Rollback,
    /// Cancel in-flight work and return to the default state.
    Reset,
    /// Driver usage marker.
    Telemetry {
        /// Reported API surface identifier.
        api: i64,
    },
}

impl RequestMessage {
    /// The message's declared type, used for transition table lookup.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Hello { .. } => MessageType::Hello,
            Self::Logon { .. } => MessageType::Logon,
            Self::Logoff => MessageType::Logoff,
            Self::Goodbye => MessageType::Goodbye,
            Self::Run { .. } => MessageType::Run,
            Self::Pull { .. } => MessageType::Pull,
            Self::Discard { .. } => MessageType::Discard,
            Self::Begin => MessageType::Begin,
            Self::Commit => MessageType::Commit,
            Self::Rollback => MessageType::Rollback,
            Self::Reset => MessageType::Reset,
            Self::Telemetry { .. } => MessageType::Telemetry,
        }
    }

    /// Create a HELLO message without inline credentials.
    pub fn hello(user_agent: &str) -> Self {
        Self::Hello {
            user_agent: user_agent.to_string(),
            credentials: None,
        }
    }

    /// Create a HELLO message carrying inline credentials.
    pub fn hello_with_credentials(user_agent: &str, credentials: Credentials) -> Self {
        Self::Hello {
            user_agent: user_agent.to_string(),
            credentials: Some(credentials),
        }
    }

    /// Create a LOGON message.
    pub fn logon(credentials: Credentials) -> Self {
        Self::Logon { credentials }
    }

    /// Create a RUN message without parameters.
    pub fn run(query: &str) -> Self {
        Self::Run {
            query: query.to_string(),
            parameters: Params::new(),
        }
    }

    /// Create a PULL message consuming the remainder of the stream.
    pub fn pull_all() -> Self {
        Self::Pull { n: Some(-1) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_mapping() {
        assert_eq!(
            RequestMessage::run("RETURN 1").message_type(),
            MessageType::Run
        );
        assert_eq!(RequestMessage::Reset.message_type(), MessageType::Reset);
        assert_eq!(
            RequestMessage::Telemetry { api: 0 }.message_type(),
            MessageType::Telemetry
        );
    }

    #[test]
    fn test_message_serialization() {
        let msg = RequestMessage::logon(Credentials::basic("alice", "s3cret"));
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: RequestMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
        assert!(json.contains("\"LOGON\""));
    }

    #[test]
    fn test_hello_credentials_omitted() {
        let json = serde_json::to_string(&RequestMessage::hello("driver/1.0")).unwrap();
        assert!(!json.contains("credentials"));
    }

    #[test]
    fn test_run_default_parameters() {
        let parsed: RequestMessage =
            serde_json::from_str(r#"{"type":"RUN","query":"RETURN 1"}"#).unwrap();
        assert_eq!(parsed, RequestMessage::run("RETURN 1"));
    }
}
