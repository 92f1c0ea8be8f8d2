//! Response boundary between the state machine and the wire-encoding layer.
//!
//! Transition handlers never encode anything; they emit records and metadata
//! into a [`ResponseSink`], and the state machine finishes each exchange with
//! exactly one of `on_success`, `on_failure`, or `on_ignored`. The embedding
//! server supplies a sink that encodes onto the wire; [`ResponseRecorder`]
//! captures outcomes in memory for tests and diagnostics.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Params;
use crate::fsm::SessionState;
use crate::protocol::MessageType;

/// A single result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Field values in declared order.
    pub fields: Vec<Value>,
}

impl Record {
    /// A record with a single field.
    pub fn single(value: Value) -> Self {
        Self {
            fields: vec![value],
        }
    }
}

/// Classification of a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The message type has no handler registered for the current state.
    IllegalTransition,
    /// Credentials were rejected; the client may retry.
    AuthenticationFailed,
    /// The execution engine or storage layer raised a typed error.
    ExecutionError,
    /// Malformed sequencing the state machine cannot recover from.
    ProtocolFatal,
}

/// A structured failure outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Stable machine-readable code.
    pub code: String,
    /// User-facing description.
    pub message: String,
    /// Whether the connection must be torn down.
    pub fatal: bool,
}

impl Failure {
    /// A message type arrived in a state that has no handler for it.
    pub fn illegal_transition(state: SessionState, message_type: MessageType) -> Self {
        Self {
            kind: FailureKind::IllegalTransition,
            code: "Graphwire.Request.Invalid".to_string(),
            message: format!("Message {message_type} is not supported in state {state}"),
            fatal: false,
        }
    }

    /// A LOGON attempt was rejected.
    pub fn authentication(message: String) -> Self {
        Self {
            kind: FailureKind::AuthenticationFailed,
            code: "Graphwire.Security.Unauthorized".to_string(),
            message,
            fatal: false,
        }
    }

    /// The execution engine reported a typed error.
    pub fn execution(code: String, message: String) -> Self {
        Self {
            kind: FailureKind::ExecutionError,
            code,
            message,
            fatal: false,
        }
    }

    /// The connection can no longer be used.
    pub fn fatal(message: String) -> Self {
        Self {
            kind: FailureKind::ProtocolFatal,
            code: "Graphwire.Connection.Fatal".to_string(),
            message,
            fatal: true,
        }
    }
}

/// Outcome sink for one message exchange.
///
/// Implementations encode outcomes onto the wire. Records and metadata may
/// arrive in any number before the terminal call; the state machine
/// guarantees exactly one terminal call per processed message (GOODBYE is
/// the one silent exception).
pub trait ResponseSink: Send {
    /// A result row produced while draining a stream.
    fn on_record(&mut self, record: Record);

    /// A metadata entry attached to the pending response.
    fn on_metadata(&mut self, key: &str, value: Value);

    /// The exchange completed successfully.
    fn on_success(&mut self);

    /// The exchange failed.
    fn on_failure(&mut self, failure: &Failure);

    /// The message was ignored due to an unresolved interrupt.
    fn on_ignored(&mut self);
}

/// Terminal outcome of a recorded exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Exchange succeeded.
    Success,
    /// Exchange failed.
    Failure(Failure),
    /// Message ignored during interrupt recovery.
    Ignored,
}

/// One fully recorded exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    /// Records emitted before the terminal call.
    pub records: Vec<Record>,
    /// Metadata attached to the response.
    pub metadata: Params,
    /// Terminal outcome.
    pub outcome: Outcome,
}

impl RecordedResponse {
    /// Whether the exchange succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// The failure, if the exchange failed.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// In-memory [`ResponseSink`] capturing complete exchanges in order.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    pending_records: Vec<Record>,
    pending_metadata: Params,
    responses: VecDeque<RecordedResponse>,
}

impl ResponseRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest recorded exchange.
    pub fn next(&mut self) -> Option<RecordedResponse> {
        self.responses.pop_front()
    }

    /// Number of completed exchanges not yet consumed.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether no completed exchange is buffered.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn complete(&mut self, outcome: Outcome) {
        let records = std::mem::take(&mut self.pending_records);
        let metadata = std::mem::take(&mut self.pending_metadata);
        self.responses.push_back(RecordedResponse {
            records,
            metadata,
            outcome,
        });
    }
}

impl ResponseSink for ResponseRecorder {
    fn on_record(&mut self, record: Record) {
        self.pending_records.push(record);
    }

    fn on_metadata(&mut self, key: &str, value: Value) {
        self.pending_metadata.insert(key.to_string(), value);
    }

    fn on_success(&mut self) {
        self.complete(Outcome::Success);
    }

    fn on_failure(&mut self, failure: &Failure) {
        self.complete(Outcome::Failure(failure.clone()));
    }

    fn on_ignored(&mut self) {
        self.complete(Outcome::Ignored);
    }
}
