//! Session protocol surface: messages, versions, and the response boundary.
//!
//! # Protocol Overview
//!
//! The protocol is a binary request/response exchange over one connection.
//! Decoding happens upstream; this crate receives [`RequestMessage`] values
//! and emits outcomes through a [`ResponseSink`].
//!
//! ## State Graph
//!
//! | State            | Meaning                              | Leaves to                               |
//! |------------------|--------------------------------------|-----------------------------------------|
//! | `CONNECTED`      | handshake complete, unauthenticated  | AUTHENTICATION (HELLO)                  |
//! | `AUTHENTICATION` | credentials required                 | READY (LOGON)                           |
//! | `READY`          | authenticated, idle                  | AUTO_COMMIT (RUN), IN_TRANSACTION (BEGIN) |
//! | `AUTO_COMMIT`    | implicit transaction streaming       | READY (stream exhausted), FAILED        |
//! | `IN_TRANSACTION` | explicit transaction open            | READY (COMMIT/ROLLBACK), FAILED         |
//! | `INTERRUPTED`    | recovering from an interrupt         | default state (RESET)                   |
//! | `FAILED`         | recoverable protocol-level error     | default state (RESET)                   |
//! | `DEFUNCT`        | connection terminated                | (terminal)                              |
//!
//! ## Version Matrix
//!
//! | Version | Authentication            | BEGIN default-state effect  | Extensions |
//! |---------|---------------------------|-----------------------------|------------|
//! | 1.0     | inline in HELLO           | pins IN_TRANSACTION         | none       |
//! | 1.1     | explicit LOGON/LOGOFF     | pins IN_TRANSACTION         | none       |
//! | 1.2     | explicit LOGON/LOGOFF     | none (RESET rolls back)     | TELEMETRY  |
//!
//! ## Failure Codes
//!
//! | Code                                 | Raised by                         |
//! |--------------------------------------|-----------------------------------|
//! | `Graphwire.Request.Invalid`          | message illegal in current state  |
//! | `Graphwire.Request.NoStream`         | PULL/DISCARD with no open stream  |
//! | `Graphwire.Security.Unauthorized`    | rejected LOGON                    |
//! | `Graphwire.Statement.*`              | engine validation errors          |
//! | `Graphwire.Connection.Fatal`         | unrecoverable sequencing          |

pub mod message;
pub mod response;
pub mod version;

pub use message::{Credentials, MessageType, Params, RequestMessage};
pub use response::{
    Failure, FailureKind, Outcome, Record, RecordedResponse, ResponseRecorder, ResponseSink,
};
pub use version::ProtocolVersion;
