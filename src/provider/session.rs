use std::{collections::HashMap, fmt::Debug, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::authorization_request::AuthorizationRequest;

/// Server-side record of one in-progress authorization.
pub trait AuthorizationSession: Debug + Clone + Send + Sync + 'static {
    /// Opaque, unguessable identifier.
    fn id(&self) -> &str;

    fn authorization_request(&self) -> &AuthorizationRequest;

    /// Expiry, in seconds since the Unix epoch.
    fn expiration_timestamp(&self) -> i64;

    fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expiration_timestamp()
    }

    fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Seconds left before expiry, never negative.
    fn expires_in(&self) -> i64 {
        (self.expiration_timestamp() - Utc::now().timestamp()).max(0)
    }
}

/// A plain authorization session, as created by the authorization code flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub authorization_request: AuthorizationRequest,
    pub expiration_timestamp: i64,
}

impl AuthorizationSession for Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn authorization_request(&self) -> &AuthorizationRequest {
        &self.authorization_request
    }

    fn expiration_timestamp(&self) -> i64 {
        self.expiration_timestamp
    }
}

/// Storage interface for authorization sessions.
///
/// Implementations are shared between concurrent requests. The `*_unexpired` operations must
/// look up, check expiry and evict in one atomic step, so that two callers racing on the same
/// expired session cannot both observe it.
#[async_trait]
pub trait SessionStore<S>: Debug {
    async fn get(&self, id: &str) -> Result<Option<S>>;

    /// Store a session, returning the one it replaced.
    async fn put(&self, id: &str, session: S) -> Result<Option<S>>;

    /// Remove a session, returning it.
    async fn remove(&self, id: &str) -> Result<Option<S>>;

    /// Get a session unless it expired at `now`, in which case it is evicted.
    async fn get_unexpired(&self, id: &str, now: i64) -> Result<Option<S>>;

    /// Remove and return a session unless it expired at `now`. Expired sessions are evicted as
    /// well, but not returned.
    async fn take_unexpired(&self, id: &str, now: i64) -> Result<Option<S>>;
}

/// A local in-memory store. Not for production use!
///
/// # Warning
/// This in-memory store should only be used for test purposes, it will not work for a distributed
/// deployment.
#[derive(Debug, Clone)]
pub struct MemoryStore<S> {
    store: Arc<Mutex<HashMap<String, S>>>,
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<S: AuthorizationSession> SessionStore<S> for MemoryStore<S> {
    async fn get(&self, id: &str) -> Result<Option<S>> {
        Ok(self.store.lock().await.get(id).cloned())
    }

    async fn put(&self, id: &str, session: S) -> Result<Option<S>> {
        Ok(self.store.lock().await.insert(id.to_owned(), session))
    }

    async fn remove(&self, id: &str) -> Result<Option<S>> {
        Ok(self.store.lock().await.remove(id))
    }

    async fn get_unexpired(&self, id: &str, now: i64) -> Result<Option<S>> {
        let mut store = self.store.lock().await;
        let expired = match store.get(id) {
            None => return Ok(None),
            Some(session) => session.is_expired_at(now),
        };
        if expired {
            debug!("evicting expired session {id}");
            store.remove(id);
            return Ok(None);
        }
        Ok(store.get(id).cloned())
    }

    async fn take_unexpired(&self, id: &str, now: i64) -> Result<Option<S>> {
        let mut store = self.store.lock().await;
        match store.remove(id) {
            Some(session) if session.is_expired_at(now) => {
                debug!("evicting expired session {id}");
                Ok(None)
            }
            session => Ok(session),
        }
    }
}
