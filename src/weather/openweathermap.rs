//! OpenWeatherMap 5 day / 3 hour forecast client

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::{ForecastProvider, RawSample};
use crate::config::WeatherConfig;
use crate::{Result, WeatherError};

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Forecast response from OpenWeatherMap
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    pub dt_txt: String,
    pub main: MainData,
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
pub struct MainData {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
    pub icon: String,
}

impl ForecastResponse {
    /// Validate the payload and convert it to raw samples.
    ///
    /// A single malformed item rejects the whole response.
    pub fn into_samples(self) -> Result<Vec<RawSample>> {
        self.list
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let timestamp = NaiveDateTime::parse_from_str(&item.dt_txt, DT_TXT_FORMAT)
                    .map_err(|e| {
                        WeatherError::provider(format!(
                            "item {i}: invalid dt_txt '{}': {e}",
                            item.dt_txt
                        ))
                    })?;
                let condition = item.weather.into_iter().next().ok_or_else(|| {
                    WeatherError::provider(format!("item {i}: empty weather array"))
                })?;

                Ok(RawSample {
                    timestamp,
                    temperature: item.main.temp,
                    description: condition.description,
                    icon: condition.icon,
                })
            })
            .collect()
    }
}

/// HTTP client for the OpenWeatherMap forecast endpoint
pub struct OpenWeatherMapClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: String,
}

impl OpenWeatherMapClient {
    /// Create a new client from the weather configuration
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WeatherError::config("OpenWeatherMap API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WeatherError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            units: config.units.clone(),
        })
    }

    fn forecast_url(&self, city: &str) -> String {
        format!(
            "{}/forecast?q={}&appid={}&units={}",
            self.base_url,
            urlencoding::encode(city),
            self.api_key,
            self.units
        )
    }

    async fn fetch_response(&self, city: &str) -> anyhow::Result<reqwest::Response> {
        self.client
            .get(self.forecast_url(city))
            .send()
            .await
            .with_context(|| format!("Forecast request for '{city}' failed"))
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn fetch(&self, city: &str) -> Result<Vec<RawSample>> {
        let start_time = Instant::now();
        debug!("Requesting forecast from {}", self.base_url);

        let response = self.fetch_response(city).await.map_err(|e| {
            warn!("Network error: {:#}", e);
            WeatherError::provider(format!("{e:#}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API error: {} - {}", status.as_u16(), body);
            return Err(WeatherError::provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        let payload: ForecastResponse = response.json().await.map_err(|e| {
            error!("Failed to parse forecast response: {}", e);
            WeatherError::provider(format!("Malformed forecast payload: {e}"))
        })?;

        let samples = payload.into_samples().inspect_err(|e| {
            error!("Rejected forecast payload: {}", e);
        })?;

        info!(
            "Retrieved {} forecast samples in {:.3}s",
            samples.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(samples)
    }
}
