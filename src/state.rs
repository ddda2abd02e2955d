//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::WeathervaneConfig;
use crate::history::{HistoryManager, HistoryStore, SessionStore};
use crate::weather::{ForecastProvider, ForecastService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WeathervaneConfig>,
    pub forecasts: ForecastService,
    pub history: HistoryManager,
}

impl AppState {
    /// Wire the services together from configuration and an already opened store.
    pub fn new(
        config: WeathervaneConfig,
        provider: Arc<dyn ForecastProvider>,
        store: HistoryStore,
    ) -> Self {
        let sessions = SessionStore::new(
            Duration::from_secs(u64::from(config.session.ttl_hours) * 60 * 60),
            config.defaults.history_limit,
        );

        Self {
            forecasts: ForecastService::new(provider),
            history: HistoryManager::new(Arc::new(store), Arc::new(sessions)),
            config: Arc::new(config),
        }
    }
}
