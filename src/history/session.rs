//! Session-scoped state for anonymous visitors
//!
//! Sessions live in memory only and expire `ttl` after their last change.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::RngExt;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::SearchEntry;

#[derive(Debug, Clone)]
struct SessionData {
    last_city: Option<String>,
    history: Vec<SearchEntry>,
    expires_at: Instant,
}

impl SessionData {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Generate a fresh opaque session id (128 random bits, hex encoded).
#[must_use]
pub fn new_session_id() -> String {
    let bits: u128 = rand::rng().random();
    format!("{bits:032x}")
}

/// Whether `id` looks like something [`new_session_id`] produced.
#[must_use]
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit())
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    ttl: Duration,
    limit: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            limit,
        }
    }

    async fn live(&self, id: &str) -> Option<SessionData> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|data| !data.is_expired(Instant::now()))
            .cloned()
    }

    /// Whether a live session exists for `id`.
    pub async fn contains(&self, id: &str) -> bool {
        self.live(id).await.is_some()
    }

    /// Start an empty session under a freshly issued id.
    pub async fn create(&self, id: &str) {
        let data = SessionData {
            last_city: None,
            history: Vec::new(),
            expires_at: Instant::now() + self.ttl,
        };
        self.sessions.write().await.insert(id.to_string(), data);
    }

    /// Remember a search for the session and mark `city` as its last city.
    ///
    /// A new (city, period) pair goes to the front; a known one stays where it is.
    /// Other expired sessions are dropped on the way.
    pub async fn record(&self, id: &str, city: &str, period: u32) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|key, data| key == id || !data.is_expired(now));
        if sessions.len() < before {
            debug!("Dropped {} expired session(s)", before - sessions.len());
        }

        let data = sessions.entry(id.to_string()).or_insert_with(|| SessionData {
            last_city: None,
            history: Vec::new(),
            expires_at: now,
        });
        if data.is_expired(now) {
            debug!("Session expired, starting over");
            data.last_city = None;
            data.history.clear();
        }

        data.last_city = Some(city.to_string());
        if !data.history.iter().any(|e| e.matches(city, period)) {
            data.history.insert(0, SearchEntry::new(city, period));
        }
        data.history.truncate(self.limit);
        data.expires_at = now + self.ttl;
    }

    /// Session history, newest first.
    pub async fn history(&self, id: &str, limit: usize) -> Vec<SearchEntry> {
        self.live(id)
            .await
            .map(|data| data.history.into_iter().take(limit).collect())
            .unwrap_or_default()
    }

    pub async fn last_city(&self, id: &str) -> Option<String> {
        self.live(id).await.and_then(|data| data.last_city)
    }

    /// Drop expired sessions, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, data| !data.is_expired(now));
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600), 10)
    }

    #[test]
    fn test_session_ids_are_unique_hex() {
        let a = new_session_id();
        let b = new_session_id();
        assert!(is_valid_session_id(&a));
        assert!(is_valid_session_id(&b));
        assert_ne!(a, b);
        assert!(!is_valid_session_id("not-a-session"));
    }

    #[tokio::test]
    async fn test_record_prepends_and_sets_last_city() {
        let sessions = store();
        sessions.record("s1", "London", 2).await;
        sessions.record("s1", "Paris", 1).await;

        let history = sessions.history("s1", 10).await;
        assert_eq!(history, vec![SearchEntry::new("Paris", 1), SearchEntry::new("London", 2)]);
        assert_eq!(sessions.last_city("s1").await.as_deref(), Some("Paris"));
        assert!(sessions.contains("s1").await);
        assert!(!sessions.contains("s2").await);
    }

    #[tokio::test]
    async fn test_duplicate_keeps_position_but_updates_last_city() {
        let sessions = store();
        sessions.record("s1", "London", 2).await;
        sessions.record("s1", "Paris", 1).await;
        sessions.record("s1", "London", 2).await;

        let history = sessions.history("s1", 10).await;
        assert_eq!(history.len(), 2);
        assert!(history[0].matches("Paris", 1));
        assert_eq!(sessions.last_city("s1").await.as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn test_london_evicted_after_twelve_more_cities() {
        let sessions = store();
        sessions.record("s1", "London", 2).await;
        for i in 0..12 {
            sessions.record("s1", &format!("City{i}"), 1).await;
        }

        let history = sessions.history("s1", 10).await;
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].city, "City11");
        assert_eq!(history[9].city, "City2");
        assert!(history.iter().all(|e| e.city != "London"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let sessions = store();
        sessions.record("s1", "London", 2).await;
        assert!(sessions.history("s2", 10).await.is_empty());
        assert!(sessions.last_city("s2").await.is_none());
    }

    #[tokio::test]
    async fn test_created_session_is_known_and_empty() {
        let sessions = store();
        assert!(!sessions.contains("s1").await);
        sessions.create("s1").await;
        assert!(sessions.contains("s1").await);
        assert!(sessions.history("s1", 10).await.is_empty());
        assert!(sessions.last_city("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_record_drops_other_expired_sessions() {
        let sessions = SessionStore::new(Duration::ZERO, 10);
        for id in ["s1", "s2", "s3"] {
            sessions.create(id).await;
        }
        sessions.record("s4", "Oslo", 1).await;

        // only the session just written is left, and it has expired too
        assert_eq!(sessions.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_expired_session_reads_empty_and_is_purged() {
        let sessions = SessionStore::new(Duration::ZERO, 10);
        sessions.record("s1", "London", 2).await;

        assert!(sessions.history("s1", 10).await.is_empty());
        assert!(sessions.last_city("s1").await.is_none());
        assert_eq!(sessions.purge_expired().await, 1);
    }
}
