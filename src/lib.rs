//! `Weathervane` - multi-day weather forecasts with per-visitor search history
//!
//! This library provides the forecast summarizer, the durable and
//! session-scoped history backends, and the HTTP surface on top of them.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod state;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::WeathervaneConfig;
pub use error::WeatherError;
pub use history::{HistoryManager, HistoryStore, Identity, SearchHistory, SessionStore};
pub use models::{CityStats, DailySummary, Forecast, SearchEntry, Slot, SlotLabel};
pub use state::AppState;
pub use weather::{ForecastProvider, ForecastService, OpenWeatherMapClient, RawSample};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;
