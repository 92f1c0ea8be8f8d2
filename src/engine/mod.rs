//! External collaborator boundaries: query execution and authentication.
//!
//! The state machine never runs queries or verifies credentials itself. It
//! talks to an [`ExecutionEngine`] and an [`AuthenticationProvider`] through
//! the object-safe traits defined here; both return boxed futures so that
//! engine work can be genuinely asynchronous and cancellable.
//!
//! Contract highlights (enforced by the state machine, relied on by
//! implementations):
//!
//! - `begin_query` returns as soon as a handle is allocated; results, and
//!   any deferred execution errors, surface only through `pull`/`discard`.
//! - `cancel` resolves only after the in-flight work attributable to the
//!   handle has actually stopped. A RESET awaits that acknowledgement.
//! - Validation errors carry a stable code and a user-facing message; they
//!   are recoverable and never require reconnecting.

mod memory;

pub use memory::{InMemoryEngine, StaticAuthenticator};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::protocol::{Credentials, Params, Record};

/// Opaque handle naming one in-flight query stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(u64);

impl QueryHandle {
    /// Create a handle from an engine-assigned identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The engine-assigned identifier.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Errors raised at the execution engine boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A typed validation error (constraint violation, type mismatch).
    /// Recoverable; the session moves to FAILED and a RESET restores it.
    #[error("{message}")]
    Validation {
        /// Stable machine-readable code.
        code: String,
        /// User-facing description.
        message: String,
    },

    /// Query execution failed for a non-validation reason. Recoverable.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The engine is unusable; the connection must be torn down.
    #[error("engine failure: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Whether the connection must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Result of draining rows from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PullResult {
    /// Rows drained, in order.
    pub records: Vec<Record>,
    /// Whether the stream has further rows.
    pub has_more: bool,
}

/// Result of discarding rows from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Whether the stream has further rows.
    pub has_more: bool,
}

/// The query-execution boundary.
///
/// Implementations own all transactional storage state. When no explicit
/// transaction is open, `begin_query` allocates an implicit transaction that
/// closes when its stream is exhausted or cancelled.
pub trait ExecutionEngine: Send + Sync {
    /// Start executing a query and allocate a stream handle for its results.
    fn begin_query<'a>(
        &'a self,
        query: &'a str,
        parameters: &'a Params,
    ) -> BoxFuture<'a, Result<QueryHandle, EngineError>>;

    /// Drain up to `n` rows from the stream (`n < 0` drains the remainder).
    fn pull(&self, handle: QueryHandle, n: i64) -> BoxFuture<'_, Result<PullResult, EngineError>>;

    /// Drop up to `n` rows from the stream without producing them.
    fn discard(
        &self,
        handle: QueryHandle,
        n: i64,
    ) -> BoxFuture<'_, Result<StreamSummary, EngineError>>;

    /// Cancel in-flight work for the handle and discard its buffered rows.
    ///
    /// Resolves only once the work has truly stopped.
    fn cancel(&self, handle: QueryHandle) -> BoxFuture<'_, Result<(), EngineError>>;

    /// Open an explicit transaction.
    fn begin_transaction(&self) -> BoxFuture<'_, Result<(), EngineError>>;

    /// Commit the open explicit transaction, returning a bookmark.
    fn commit(&self) -> BoxFuture<'_, Result<String, EngineError>>;

    /// Abort the open explicit transaction.
    fn rollback(&self) -> BoxFuture<'_, Result<(), EngineError>>;
}

/// An authenticated principal, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSubject {
    /// Principal the credentials resolved to.
    pub principal: String,
}

/// A rejected authentication attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AuthenticationError(pub String);

/// The credential-verification boundary.
pub trait AuthenticationProvider: Send + Sync {
    /// Validate credentials, producing the authenticated subject.
    fn logon<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthSubject, AuthenticationError>>;
}
