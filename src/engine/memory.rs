//! In-process collaborators backing tests and embedded use.
//!
//! [`InMemoryEngine`] evaluates a miniature statement language:
//!
//! - `RETURN <json>` — streams a single row holding the literal.
//! - `UNWIND <json array>` — streams one row per array element.
//! - `CREATE <json>` — appends the literal to the store (staged while an
//!   explicit transaction is open, applied immediately otherwise).
//!
//! Anything else defers a typed validation error that surfaces on the
//! first PULL or DISCARD, matching the streaming contract: `begin_query`
//! never reports execution outcomes itself.

use std::collections::{HashMap, VecDeque};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    AuthSubject, AuthenticationError, AuthenticationProvider, EngineError, ExecutionEngine,
    PullResult, QueryHandle, StreamSummary,
};
use crate::protocol::{Credentials, Params, Record};

struct Stream {
    records: VecDeque<Record>,
    pending_error: Option<EngineError>,
}

#[derive(Default)]
struct EngineInner {
    committed: Vec<Value>,
    staged: Option<Vec<Value>>,
    streams: HashMap<u64, Stream>,
    next_handle: u64,
    bookmark_counter: u64,
}

/// A miniature in-memory execution engine.
#[derive(Default)]
pub struct InMemoryEngine {
    inner: Mutex<EngineInner>,
}

impl InMemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Values durably applied to the store.
    pub async fn committed(&self) -> Vec<Value> {
        self.inner.lock().await.committed.clone()
    }

    /// Whether any query stream is still open.
    pub async fn has_open_streams(&self) -> bool {
        !self.inner.lock().await.streams.is_empty()
    }

    fn evaluate(inner: &mut EngineInner, query: &str) -> Stream {
        if let Some(literal) = query.strip_prefix("RETURN ") {
            return match serde_json::from_str(literal) {
                Ok(value) => Stream {
                    records: VecDeque::from(vec![Record::single(value)]),
                    pending_error: None,
                },
                Err(err) => Stream {
                    records: VecDeque::new(),
                    pending_error: Some(EngineError::Validation {
                        code: "Graphwire.Statement.SyntaxError".to_string(),
                        message: format!("Invalid literal in RETURN: {err}"),
                    }),
                },
            };
        }

        if let Some(literal) = query.strip_prefix("UNWIND ") {
            return match serde_json::from_str::<Value>(literal) {
                Ok(Value::Array(values)) => Stream {
                    records: values.into_iter().map(Record::single).collect(),
                    pending_error: None,
                },
                Ok(_) | Err(_) => Stream {
                    records: VecDeque::new(),
                    pending_error: Some(EngineError::Validation {
                        code: "Graphwire.Statement.TypeError".to_string(),
                        message: "UNWIND requires a list".to_string(),
                    }),
                },
            };
        }

        if let Some(literal) = query.strip_prefix("CREATE ") {
            return match serde_json::from_str::<Value>(literal) {
                Ok(value) => {
                    match inner.staged.as_mut() {
                        Some(staged) => staged.push(value),
                        None => inner.committed.push(value),
                    }
                    Stream {
                        records: VecDeque::new(),
                        pending_error: None,
                    }
                }
                Err(err) => Stream {
                    records: VecDeque::new(),
                    pending_error: Some(EngineError::Validation {
                        code: "Graphwire.Statement.SyntaxError".to_string(),
                        message: format!("Invalid literal in CREATE: {err}"),
                    }),
                },
            };
        }

        Stream {
            records: VecDeque::new(),
            pending_error: Some(EngineError::Validation {
                code: "Graphwire.Statement.TypeError".to_string(),
                message: format!("Type mismatch: unable to execute `{query}`"),
            }),
        }
    }
}

impl ExecutionEngine for InMemoryEngine {
    fn begin_query<'a>(
        &'a self,
        query: &'a str,
        _parameters: &'a Params,
    ) -> BoxFuture<'a, Result<QueryHandle, EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let stream = Self::evaluate(&mut inner, query);
            inner.next_handle += 1;
            let id = inner.next_handle;
            inner.streams.insert(id, stream);
            Ok(QueryHandle::new(id))
        })
    }

    fn pull(&self, handle: QueryHandle, n: i64) -> BoxFuture<'_, Result<PullResult, EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let stream = inner
                .streams
                .get_mut(&handle.id())
                .ok_or_else(|| EngineError::Execution(format!("no stream {}", handle.id())))?;

            if let Some(err) = stream.pending_error.take() {
                inner.streams.remove(&handle.id());
                return Err(err);
            }

            let count = if n < 0 {
                stream.records.len()
            } else {
                (n as usize).min(stream.records.len())
            };
            let records: Vec<Record> = stream.records.drain(..count).collect();
            let has_more = !stream.records.is_empty();
            if !has_more {
                inner.streams.remove(&handle.id());
            }
            Ok(PullResult { records, has_more })
        })
    }

    fn discard(
        &self,
        handle: QueryHandle,
        n: i64,
    ) -> BoxFuture<'_, Result<StreamSummary, EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let stream = inner
                .streams
                .get_mut(&handle.id())
                .ok_or_else(|| EngineError::Execution(format!("no stream {}", handle.id())))?;

            if let Some(err) = stream.pending_error.take() {
                inner.streams.remove(&handle.id());
                return Err(err);
            }

            let count = if n < 0 {
                stream.records.len()
            } else {
                (n as usize).min(stream.records.len())
            };
            stream.records.drain(..count);
            let has_more = !stream.records.is_empty();
            if !has_more {
                inner.streams.remove(&handle.id());
            }
            Ok(StreamSummary { has_more })
        })
    }

    fn cancel(&self, handle: QueryHandle) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            // Idempotent; cancelling an unknown or finished stream is a no-op.
            self.inner.lock().await.streams.remove(&handle.id());
            Ok(())
        })
    }

    fn begin_transaction(&self) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.staged.is_some() {
                return Err(EngineError::Execution(
                    "a transaction is already open".to_string(),
                ));
            }
            inner.staged = Some(Vec::new());
            Ok(())
        })
    }

    fn commit(&self) -> BoxFuture<'_, Result<String, EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let staged = inner
                .staged
                .take()
                .ok_or_else(|| EngineError::Execution("no open transaction".to_string()))?;
            inner.committed.extend(staged);
            inner.bookmark_counter += 1;
            Ok(format!("gw:bookmark:{}", inner.bookmark_counter))
        })
    }

    fn rollback(&self) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner
                .staged
                .take()
                .ok_or_else(|| EngineError::Execution("no open transaction".to_string()))?;
            Ok(())
        })
    }
}

/// Authentication provider backed by a fixed principal/secret table.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, String>,
}

impl StaticAuthenticator {
    /// Create a provider with no users.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal with its secret.
    pub fn with_user(mut self, principal: &str, secret: &str) -> Self {
        self.users.insert(principal.to_string(), secret.to_string());
        self
    }
}

impl AuthenticationProvider for StaticAuthenticator {
    fn logon<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthSubject, AuthenticationError>> {
        Box::pin(async move {
            if credentials.scheme != "basic" {
                return Err(AuthenticationError(format!(
                    "Unsupported authentication scheme: {}",
                    credentials.scheme
                )));
            }
            match self.users.get(&credentials.principal) {
                Some(secret) if *secret == credentials.secret => Ok(AuthSubject {
                    principal: credentials.principal.clone(),
                }),
                _ => Err(AuthenticationError(
                    "The client is unauthorized due to authentication failure".to_string(),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_return_streams_one_row() {
        let engine = InMemoryEngine::new();
        let handle = engine.begin_query("RETURN 1", &Params::new()).await.unwrap();
        let result = engine.pull(handle, -1).await.unwrap();
        assert_eq!(result.records, vec![Record::single(json!(1))]);
        assert!(!result.has_more);
        assert!(!engine.has_open_streams().await);
    }

    #[tokio::test]
    async fn test_unwind_supports_partial_pulls() {
        let engine = InMemoryEngine::new();
        let handle = engine
            .begin_query("UNWIND [1, 2, 3]", &Params::new())
            .await
            .unwrap();

        let first = engine.pull(handle, 2).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.has_more);

        let rest = engine.pull(handle, 2).await.unwrap();
        assert_eq!(rest.records, vec![Record::single(json!(3))]);
        assert!(!rest.has_more);
    }

    #[tokio::test]
    async fn test_invalid_statement_defers_error_to_pull() {
        let engine = InMemoryEngine::new();
        let handle = engine
            .begin_query("MUTATE gibberish", &Params::new())
            .await
            .unwrap();
        let err = engine.pull(handle, -1).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref code, .. }
            if code == "Graphwire.Statement.TypeError"));
    }

    #[tokio::test]
    async fn test_transaction_staging() {
        let engine = InMemoryEngine::new();
        engine.begin_transaction().await.unwrap();
        let handle = engine
            .begin_query("CREATE {\"k\":\"v\"}", &Params::new())
            .await
            .unwrap();
        engine.pull(handle, -1).await.unwrap();
        assert!(engine.committed().await.is_empty());

        let bookmark = engine.commit().await.unwrap();
        assert!(bookmark.starts_with("gw:bookmark:"));
        assert_eq!(engine.committed().await, vec![json!({"k": "v"})]);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let engine = InMemoryEngine::new();
        engine.begin_transaction().await.unwrap();
        let handle = engine
            .begin_query("CREATE {\"k\":\"v\"}", &Params::new())
            .await
            .unwrap();
        engine.pull(handle, -1).await.unwrap();
        engine.rollback().await.unwrap();
        assert!(engine.committed().await.is_empty());
        assert!(engine.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_static_authenticator() {
        let auth = StaticAuthenticator::new().with_user("alice", "s3cret");
        let subject = auth
            .logon(&Credentials::basic("alice", "s3cret"))
            .await
            .unwrap();
        assert_eq!(subject.principal, "alice");
        assert!(auth.logon(&Credentials::basic("alice", "wrong")).await.is_err());
        assert!(auth.logon(&Credentials::basic("mallory", "x")).await.is_err());
    }
}
