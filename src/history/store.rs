//! Durable search history for authenticated users, backed by fjall.
//!
//! Each user's searches live under `user:{id}` as one postcard-encoded list,
//! newest first. The `users` key indexes every user that has a list so the
//! per-city statistics can be aggregated without a range scan.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use fjall::Keyspace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info};

use crate::models::{CityStats, HistoryRecord, SearchEntry};

const USERS_KEY: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSearch {
    city: String,
    period: u32,
    created_at_micros: i64,
}

impl StoredSearch {
    fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.created_at_micros).unwrap_or_default()
    }

    fn to_entry(&self) -> SearchEntry {
        SearchEntry::new(self.city.clone(), self.period).with_timestamp(self.timestamp())
    }
}

/// Filters for the admin listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    /// Exact city match
    pub city: Option<String>,
    /// Exact user id match
    pub user: Option<String>,
    /// Case-insensitive substring of the city
    pub search: Option<String>,
}

impl RecordFilter {
    fn accepts(&self, user: &str, search: &StoredSearch) -> bool {
        self.city.as_deref().is_none_or(|city| search.city == city)
            && self.user.as_deref().is_none_or(|u| user == u)
            && self.search.as_deref().is_none_or(|needle| {
                search.city.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}

fn user_key(user: &str) -> String {
    format!("user:{user}")
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

pub struct HistoryStore {
    store: Keyspace,
    limit: usize,
    // serializes read-modify-write of a user's list
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Open (or create) the store at `path`, keeping at most `limit` entries per user.
    pub fn open(path: impl AsRef<Path>, limit: usize) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("history", fjall::KeyspaceCreateOptions::default)?;
        info!("Opened history store at {}", path.as_ref().display());
        Ok(HistoryStore {
            store: items,
            limit,
            write_lock: Mutex::new(()),
        })
    }

    async fn read<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;
        maybe_bytes
            .map(|bytes| postcard::from_bytes(&bytes).map_err(|e| anyhow!("Corrupt value at '{key}': {e}")))
            .transpose()
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let bytes = postcard::to_stdvec(value)?;
        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn searches(&self, user: &str) -> Result<Vec<StoredSearch>> {
        Ok(self.read(&user_key(user)).await?.unwrap_or_default())
    }

    async fn users(&self) -> Result<Vec<String>> {
        Ok(self.read(USERS_KEY).await?.unwrap_or_default())
    }

    /// Remember a search for `user` unless the same (city, period) is already stored.
    ///
    /// Returns whether a new entry was inserted. The list is trimmed to the
    /// retention limit afterwards.
    #[tracing::instrument(name = "record_history", level = "debug", skip(self))]
    pub async fn record(&self, user: &str, city: &str, period: u32) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut searches = self.searches(user).await?;
        if searches.iter().any(|s| s.city == city && s.period == period) {
            debug!("Search already in history");
            return Ok(false);
        }

        if searches.is_empty() {
            let mut users = self.users().await?;
            if !users.iter().any(|u| u == user) {
                users.push(user.to_string());
                self.write(USERS_KEY, &users).await?;
            }
        }

        searches.insert(
            0,
            StoredSearch {
                city: city.to_string(),
                period,
                created_at_micros: Utc::now().timestamp_micros(),
            },
        );
        if searches.len() > self.limit {
            debug!("Trimming {} old entries", searches.len() - self.limit);
            searches.truncate(self.limit);
        }

        self.write(&user_key(user), &searches).await?;
        Ok(true)
    }

    /// Most recent searches of `user`, newest first.
    pub async fn recent(&self, user: &str, limit: usize) -> Result<Vec<SearchEntry>> {
        Ok(self
            .searches(user)
            .await?
            .iter()
            .take(limit)
            .map(StoredSearch::to_entry)
            .collect())
    }

    /// Number of stored searches per city across all users,
    /// by count descending, then by city.
    pub async fn city_stats(&self) -> Result<Vec<CityStats>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for user in self.users().await? {
            for search in self.searches(&user).await? {
                *counts.entry(search.city).or_default() += 1;
            }
        }

        let mut stats: Vec<CityStats> = counts
            .into_iter()
            .map(|(city, count)| CityStats { city, count })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
        Ok(stats)
    }

    /// All stored records matching `filter`, newest first.
    pub async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<HistoryRecord>> {
        let mut records = Vec::new();
        for user in self.users().await? {
            for search in self.searches(&user).await? {
                if filter.accepts(&user, &search) {
                    records.push(HistoryRecord {
                        user: user.clone(),
                        timestamp: search.timestamp(),
                        city: search.city,
                        period: search.period,
                    });
                }
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}
