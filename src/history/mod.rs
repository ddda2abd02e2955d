//! Recent-search history
//!
//! Authenticated users keep their history in the durable [`HistoryStore`];
//! anonymous visitors keep it in their session. Both sit behind
//! [`SearchHistory`] and are picked from the request [`Identity`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::models::SearchEntry;

pub mod session;
pub mod store;

pub use session::SessionStore;
pub use store::{HistoryStore, RecordFilter};

/// Entries kept and shown per identity unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Authenticated user with a stable id
    User(String),
    /// Anonymous visitor identified by a session id
    Anonymous(String),
}

/// Recent searches of one identity, newest first, without duplicate (city, period) pairs
#[async_trait]
pub trait SearchHistory: Send + Sync {
    /// Remember a search. Call only after a non-empty forecast.
    async fn record(&self, city: &str, period: u32) -> Result<()>;

    /// Up to `limit` most recent searches.
    async fn recent(&self, limit: usize) -> Result<Vec<SearchEntry>>;

    /// City of the last search, if any.
    async fn last_city(&self) -> Result<Option<String>>;
}

pub struct DurableHistory {
    store: Arc<HistoryStore>,
    user_id: String,
}

#[async_trait]
impl SearchHistory for DurableHistory {
    async fn record(&self, city: &str, period: u32) -> Result<()> {
        self.store.record(&self.user_id, city, period).await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SearchEntry>> {
        Ok(self.store.recent(&self.user_id, limit).await?)
    }

    async fn last_city(&self) -> Result<Option<String>> {
        let latest = self.store.recent(&self.user_id, 1).await?;
        Ok(latest.into_iter().next().map(|entry| entry.city))
    }
}

pub struct SessionHistory {
    sessions: Arc<SessionStore>,
    session_id: String,
}

#[async_trait]
impl SearchHistory for SessionHistory {
    async fn record(&self, city: &str, period: u32) -> Result<()> {
        self.sessions.record(&self.session_id, city, period).await;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SearchEntry>> {
        Ok(self.sessions.history(&self.session_id, limit).await)
    }

    async fn last_city(&self) -> Result<Option<String>> {
        Ok(self.sessions.last_city(&self.session_id).await)
    }
}

/// Hands out the history backend matching an identity
#[derive(Clone)]
pub struct HistoryManager {
    store: Arc<HistoryStore>,
    sessions: Arc<SessionStore>,
}

impl HistoryManager {
    pub fn new(store: Arc<HistoryStore>, sessions: Arc<SessionStore>) -> Self {
        Self { store, sessions }
    }

    #[must_use]
    pub fn backend_for(&self, identity: &Identity) -> Box<dyn SearchHistory> {
        match identity {
            Identity::User(user_id) => Box::new(DurableHistory {
                store: Arc::clone(&self.store),
                user_id: user_id.clone(),
            }),
            Identity::Anonymous(session_id) => Box::new(SessionHistory {
                sessions: Arc::clone(&self.sessions),
                session_id: session_id.clone(),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
