//! Data models for the Weathervane service
//!
//! This module contains the core domain models organized by concern:
//! - Forecast: provider samples and the four-slot daily summaries
//! - History: search entries, admin records and per-city statistics

pub mod forecast;
pub mod history;

// Re-export all public types for convenient access
pub use forecast::{DailySummary, Forecast, ForecastSample, Slot, SlotLabel};
pub use history::{CityStats, HistoryRecord, SearchEntry};
