//! Search history entries and aggregates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered search, as shown to the visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub city: String,
    /// Requested number of forecast days
    pub period: u32,
    /// Creation time; session entries carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SearchEntry {
    #[must_use]
    pub fn new(city: impl Into<String>, period: u32) -> Self {
        Self {
            city: city.into(),
            period,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Whether this entry is the same search as `(city, period)`
    #[must_use]
    pub fn matches(&self, city: &str, period: u32) -> bool {
        self.city == city && self.period == period
    }
}

/// A durable history record together with its owner, for the admin listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user: String,
    pub city: String,
    pub period: u32,
    pub timestamp: DateTime<Utc>,
}

/// Number of stored searches for one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityStats {
    pub city: String,
    pub count: u64,
}
