//! Per-connection execution context.
//!
//! One [`ExecutionContext`] exists per connection and is mutated exclusively
//! by transition handlers during dispatch; dispatch itself is strictly
//! sequential. The single exception is the [`InterruptSignal`], which may be
//! set from outside the dispatch sequence (a network-level cancellation
//! handler) and is only ever read at dispatch boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::state::SessionState;
use crate::config::SessionConfig;
use crate::engine::{
    AuthSubject, AuthenticationError, AuthenticationProvider, EngineError, ExecutionEngine,
    QueryHandle,
};
use crate::protocol::Credentials;

/// Atomic, idempotent out-of-band interrupt flag.
///
/// Cloning yields another handle to the same flag, so the network layer can
/// hold one while the state machine holds another.
#[derive(Debug, Clone, Default)]
pub struct InterruptSignal(Arc<AtomicBool>);

impl InterruptSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Safe to call at any time, from any thread.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the signal. Called only by the RESET transition.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the signal is currently raised.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The connection's authentication and engine handle.
///
/// Owns the authenticated subject, if any; the session-switch contract
/// (`logon`, `logoff`, `is_authenticated`) lives here.
pub struct ConnectionHandle {
    id: Uuid,
    auth: Arc<dyn AuthenticationProvider>,
    engine: Arc<dyn ExecutionEngine>,
    subject: Option<AuthSubject>,
}

impl ConnectionHandle {
    /// Create a handle for a freshly negotiated connection.
    pub fn new(auth: Arc<dyn AuthenticationProvider>, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth,
            engine,
            subject: None,
        }
    }

    /// Unique connection identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Validate credentials and record the authenticated subject.
    pub async fn logon(&mut self, credentials: &Credentials) -> Result<(), AuthenticationError> {
        let subject = self.auth.logon(credentials).await?;
        tracing::debug!(connection = %self.id, principal = %subject.principal, "logon");
        self.subject = Some(subject);
        Ok(())
    }

    /// Drop the authenticated subject.
    pub fn logoff(&mut self) {
        if let Some(subject) = self.subject.take() {
            tracing::debug!(connection = %self.id, principal = %subject.principal, "logoff");
        }
    }

    /// Whether the connection currently holds an authenticated subject.
    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    /// The authenticated subject, if any.
    pub fn subject(&self) -> Option<&AuthSubject> {
        self.subject.as_ref()
    }

    /// The execution engine serving this connection.
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        Arc::clone(&self.engine)
    }
}

/// Per-connection mutable state threaded through every transition.
pub struct ExecutionContext {
    connection: ConnectionHandle,
    config: SessionConfig,
    current_state: SessionState,
    default_state: SessionState,
    interrupt: InterruptSignal,
    active_query: Option<QueryHandle>,
    transaction_open: bool,
}

impl ExecutionContext {
    /// Create a context for a connection that has completed its handshake.
    pub fn new(connection: ConnectionHandle, config: SessionConfig) -> Self {
        Self {
            connection,
            config,
            current_state: SessionState::Connected,
            default_state: SessionState::Connected,
            interrupt: InterruptSignal::new(),
            active_query: None,
            transaction_open: false,
        }
    }

    /// The session's current state.
    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    /// The state a RESET returns the session to.
    pub fn default_state(&self) -> SessionState {
        self.default_state
    }

    pub(crate) fn set_current_state(&mut self, state: SessionState) {
        self.current_state = state;
    }

    pub(crate) fn set_default_state(&mut self, state: SessionState) {
        self.default_state = state;
    }

    /// The connection's interrupt signal.
    pub fn interrupt(&self) -> &InterruptSignal {
        &self.interrupt
    }

    /// A clonable handle to the interrupt signal for out-of-band delivery.
    pub fn interrupt_signal(&self) -> InterruptSignal {
        self.interrupt.clone()
    }

    /// The connection handle.
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Mutable access to the connection handle.
    pub fn connection_mut(&mut self) -> &mut ConnectionHandle {
        &mut self.connection
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolve a requested row count against the configured default.
    pub fn fetch_size(&self, n: Option<i64>) -> i64 {
        n.unwrap_or(self.config.default_fetch_size)
    }

    /// The in-flight query stream, if any.
    pub fn active_query(&self) -> Option<QueryHandle> {
        self.active_query
    }

    pub(crate) fn set_active_query(&mut self, handle: QueryHandle) {
        self.active_query = Some(handle);
    }

    pub(crate) fn clear_active_query(&mut self) {
        self.active_query = None;
    }

    /// Whether an explicit transaction is open.
    pub fn transaction_open(&self) -> bool {
        self.transaction_open
    }

    pub(crate) fn set_transaction_open(&mut self, open: bool) {
        self.transaction_open = open;
    }

    /// Cancel the in-flight query stream, awaiting acknowledgement.
    pub(crate) async fn cancel_active_query(&mut self) -> Result<(), EngineError> {
        if let Some(handle) = self.active_query.take() {
            tracing::debug!(connection = %self.connection.id(), query = handle.id(), "cancel");
            self.connection.engine().cancel(handle).await?;
        }
        Ok(())
    }

    /// Roll back the open explicit transaction, if any.
    pub(crate) async fn rollback_open_transaction(&mut self) -> Result<(), EngineError> {
        if self.transaction_open {
            self.transaction_open = false;
            self.connection.engine().rollback().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InMemoryEngine, StaticAuthenticator};

    fn context() -> ExecutionContext {
        let auth = Arc::new(StaticAuthenticator::new().with_user("alice", "s3cret"));
        let engine = Arc::new(InMemoryEngine::new());
        ExecutionContext::new(ConnectionHandle::new(auth, engine), SessionConfig::default())
    }

    #[test]
    fn test_interrupt_signal_shared_between_clones() {
        let ctx = context();
        let remote = ctx.interrupt_signal();
        assert!(!ctx.interrupt().is_set());
        remote.set();
        remote.set(); // idempotent
        assert!(ctx.interrupt().is_set());
        ctx.interrupt().clear();
        assert!(!remote.is_set());
    }

    #[tokio::test]
    async fn test_logon_logoff_cycle() {
        let mut ctx = context();
        assert!(!ctx.connection().is_authenticated());

        ctx.connection_mut()
            .logon(&Credentials::basic("alice", "s3cret"))
            .await
            .unwrap();
        assert!(ctx.connection().is_authenticated());
        assert_eq!(ctx.connection().subject().unwrap().principal, "alice");

        ctx.connection_mut().logoff();
        assert!(!ctx.connection().is_authenticated());
    }

    #[test]
    fn test_fetch_size_defaulting() {
        let ctx = context();
        assert_eq!(ctx.fetch_size(Some(7)), 7);
        assert_eq!(ctx.fetch_size(None), SessionConfig::default().default_fetch_size);
    }
}
