//! # Graphwire - Graph Database Session Protocol Core
//!
//! Session-protocol state machine governing a single client connection to a
//! graph database server over a binary request/response wire protocol. The
//! crate tracks which operations a client may legally perform at any moment
//! and enforces that only semantically valid messages move the session
//! forward.
//!
//! ## Architecture
//!
//! ```text
//!   wire decoding ──> RequestMessage
//!                          │
//!                          v
//!                    StateMachine ──── interrupt flag (out-of-band)
//!                          │
//!             TransitionTable lookup (state, message type)
//!                          │
//!                 StateTransition handler
//!                    │            │
//!         ExecutionContext   ResponseSink ──> wire encoding
//!            │        │
//!   AuthenticationProvider  ExecutionEngine
//! ```
//!
//! The transition table is built once per negotiated protocol version and
//! shared read-only across connections; handlers are stateless singletons.
//! Each connection owns exactly one [`ExecutionContext`](fsm::ExecutionContext)
//! and processes messages strictly sequentially. The only out-of-band input
//! is the [`InterruptSignal`](fsm::InterruptSignal), an atomic flag checked
//! once per message: while it is raised, everything except RESET is answered
//! "ignored".
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use graphwire::config::SessionConfig;
//! use graphwire::engine::{InMemoryEngine, StaticAuthenticator};
//! use graphwire::fsm::{ConnectionHandle, StateMachine};
//! use graphwire::protocol::{Credentials, ProtocolVersion, RequestMessage, ResponseRecorder};
//!
//! let auth = Arc::new(StaticAuthenticator::new().with_user("alice", "s3cret"));
//! let engine = Arc::new(InMemoryEngine::new());
//! let mut fsm = StateMachine::for_version(
//!     ProtocolVersion::V1_1,
//!     ConnectionHandle::new(auth, engine),
//!     SessionConfig::default(),
//! )?;
//!
//! let mut sink = ResponseRecorder::new();
//! fsm.process(&RequestMessage::hello("driver/1.0"), &mut sink).await?;
//! fsm.process(&RequestMessage::logon(Credentials::basic("alice", "s3cret")), &mut sink).await?;
//! fsm.process(&RequestMessage::run("RETURN 1"), &mut sink).await?;
//! fsm.process(&RequestMessage::pull_all(), &mut sink).await?;
//! ```
//!
//! ## Modules
//!
//! - [`fsm`]: state machine, transition table, handlers, execution context
//! - [`protocol`]: messages, protocol versions, response boundary
//! - [`engine`]: execution-engine and authentication boundaries
//! - [`config`]: session configuration
//! - [`error`]: error types and result alias

pub mod config;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod protocol;

// Re-exports for convenience
pub use config::SessionConfig;
pub use engine::{AuthenticationProvider, EngineError, ExecutionEngine, QueryHandle};
pub use error::{GraphwireError, Result};
pub use fsm::{ConnectionHandle, InterruptSignal, SessionState, StateMachine, TransitionTable};
pub use protocol::{
    Credentials, Failure, FailureKind, MessageType, ProtocolVersion, RequestMessage,
    ResponseRecorder, ResponseSink,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
