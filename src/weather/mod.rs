//! Forecast summarization
//!
//! Raw provider samples arrive every ~3 hours. They are grouped by calendar
//! date in the order dates are first seen, cut to the requested number of
//! days, and each day is reduced to four labeled slots.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::models::{DailySummary, Forecast, ForecastSample, Slot, SlotLabel};

pub mod openweathermap;
pub mod translate;

pub use openweathermap::OpenWeatherMapClient;
pub use translate::translate_description;

/// Every summarized day holds exactly this many slots
pub const SLOTS_PER_DAY: usize = 4;

/// A provider sample before grouping and translation
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub description: String,
    pub icon: String,
}

/// Source of raw forecast samples for a city
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch samples ordered by timestamp ascending
    async fn fetch(&self, city: &str) -> Result<Vec<RawSample>>;
}

/// Turns provider samples into daily summaries
#[derive(Clone)]
pub struct ForecastService {
    provider: Arc<dyn ForecastProvider>,
}

impl ForecastService {
    pub fn new(provider: Arc<dyn ForecastProvider>) -> Self {
        Self { provider }
    }

    /// Summarize up to `days` days of forecast for `city`.
    ///
    /// Provider failures are logged and produce an empty forecast.
    #[instrument(skip(self))]
    pub async fn summarize(&self, city: &str, days: u32) -> Forecast {
        match self.provider.fetch(city).await {
            Ok(samples) => {
                let forecast = summarize_samples(samples, days);
                info!("Summarized {} day(s) of forecast for '{}'", forecast.len(), city);
                forecast
            }
            Err(e) => {
                warn!("Forecast unavailable for '{}': {}", city, e);
                Forecast::new()
            }
        }
    }
}

/// Reduce raw samples to at most `days` daily summaries.
#[must_use]
pub fn summarize_samples(samples: Vec<RawSample>, days: u32) -> Forecast {
    let mut grouped = group_by_date(samples);
    // encounter order, not calendar order
    grouped.truncate(usize::try_from(days).unwrap_or(usize::MAX));

    grouped
        .into_iter()
        .map(|(date, samples)| summarize_day(date, samples))
        .collect()
}

/// Group samples by calendar date, translating descriptions on the way.
///
/// Dates keep the order in which they were first encountered.
#[must_use]
pub fn group_by_date(samples: Vec<RawSample>) -> Vec<(NaiveDate, Vec<ForecastSample>)> {
    let mut grouped: Vec<(NaiveDate, Vec<ForecastSample>)> = Vec::new();

    for raw in samples {
        let date = raw.timestamp.date();
        let sample = ForecastSample {
            date,
            time: raw.timestamp.format("%H:%M:%S").to_string(),
            temperature: raw.temperature,
            description: translate_description(&raw.description),
            raw_description: raw.description,
            icon: raw.icon,
        };

        match grouped.iter_mut().find(|(d, _)| *d == date) {
            Some((_, day)) => day.push(sample),
            None => grouped.push((date, vec![sample])),
        }
    }

    grouped
}

/// Sort a day's samples by time of day and pad to at least four entries
/// by repeating the first one.
#[must_use]
pub fn pad_samples(mut samples: Vec<ForecastSample>) -> Vec<ForecastSample> {
    samples.sort_by(|a, b| a.time.cmp(&b.time));

    if let Some(first) = samples.first().cloned() {
        while samples.len() < SLOTS_PER_DAY {
            samples.push(first.clone());
        }
    }

    samples
}

/// Indices picked for Night, Morning, Day and Evening from a list of `n` samples.
#[must_use]
pub fn slot_indices(n: usize) -> [usize; SLOTS_PER_DAY] {
    [0, n / 4, n / 2, n.saturating_sub(1)]
}

/// Build the four-slot summary of one day.
///
/// `samples` is never empty: every grouped date holds at least one sample.
#[must_use]
pub fn summarize_day(date: NaiveDate, samples: Vec<ForecastSample>) -> DailySummary {
    let padded = pad_samples(samples);
    let indices = slot_indices(padded.len());
    debug!("{}: {} samples, slot indices {:?}", date, padded.len(), indices);

    let slots = SlotLabel::ALL.map(|label| {
        let sample = &padded[indices[label as usize]];
        Slot::from_sample(label, sample)
    });

    DailySummary::new(date, slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeatherError;
    use rstest::rstest;

    fn raw(ts: &str, temp: f64, description: &str) -> RawSample {
        RawSample {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            temperature: temp,
            description: description.to_string(),
            icon: "01d".to_string(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct StaticProvider(Vec<RawSample>);

    #[async_trait]
    impl ForecastProvider for StaticProvider {
        async fn fetch(&self, _city: &str) -> Result<Vec<RawSample>> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ForecastProvider for FailingProvider {
        async fn fetch(&self, _city: &str) -> Result<Vec<RawSample>> {
            Err(WeatherError::provider("HTTP 404 Not Found: city not found"))
        }
    }

    #[test]
    fn test_four_samples_map_to_slots() {
        let samples = vec![
            raw("2025-05-28 00:00:00", 20.0, "clear sky"),
            raw("2025-05-28 03:00:00", 21.0, "few clouds"),
            raw("2025-05-28 06:00:00", 22.0, "scattered clouds"),
            raw("2025-05-28 09:00:00", 23.0, "broken clouds"),
        ];

        let forecast = summarize_samples(samples, 1);
        assert_eq!(forecast.len(), 1);
        let day = &forecast[0];
        assert_eq!(day.date, date("2025-05-28"));

        let night = day.slot(SlotLabel::Night);
        assert_eq!(night.temperature, 20.0);
        assert_eq!(night.description, "ясное небо");
        let morning = day.slot(SlotLabel::Morning);
        assert_eq!(morning.temperature, 21.0);
        assert_eq!(morning.description, "малооблачно");
        let noon = day.slot(SlotLabel::Day);
        assert_eq!(noon.temperature, 22.0);
        assert_eq!(noon.description, "рассеянные облака");
        let evening = day.slot(SlotLabel::Evening);
        assert_eq!(evening.temperature, 23.0);
        assert_eq!(evening.description, "облачно");
    }

    #[rstest]
    #[case(4, [0, 1, 2, 3])]
    #[case(5, [0, 1, 2, 4])]
    #[case(7, [0, 1, 3, 6])]
    #[case(8, [0, 2, 4, 7])]
    #[case(9, [0, 2, 4, 8])]
    fn test_slot_indices(#[case] n: usize, #[case] expected: [usize; 4]) {
        assert_eq!(slot_indices(n), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    fn test_padding_repeats_first_sample(#[case] count: usize) {
        let samples: Vec<ForecastSample> = group_by_date(
            (0..count)
                .map(|i| raw(&format!("2025-05-28 {:02}:00:00", 21 - i * 3), i as f64, "mist"))
                .collect(),
        )
        .remove(0)
        .1;
        let earliest = samples.iter().min_by(|a, b| a.time.cmp(&b.time)).cloned().unwrap();

        let padded = pad_samples(samples);
        assert_eq!(padded.len(), 4);
        assert_eq!(padded[0], earliest);
        assert!(padded[count..].iter().all(|s| *s == earliest));
    }

    #[test]
    fn test_single_sample_fills_every_slot() {
        let forecast = summarize_samples(vec![raw("2025-05-28 12:00:00", 15.5, "light rain")], 3);
        assert_eq!(forecast.len(), 1);
        for slot in &forecast[0].slots {
            assert_eq!(slot.temperature, 15.5);
            assert_eq!(slot.description, "небольшой дождь");
        }
        let labels: Vec<SlotLabel> = forecast[0].slots.iter().map(|s| s.label).collect();
        assert_eq!(labels, SlotLabel::ALL.to_vec());
    }

    #[test]
    fn test_samples_sorted_by_time_within_day() {
        let samples = vec![
            raw("2025-05-28 21:00:00", 12.0, "clear sky"),
            raw("2025-05-28 03:00:00", 9.0, "clear sky"),
            raw("2025-05-28 12:00:00", 18.0, "clear sky"),
            raw("2025-05-28 00:00:00", 10.0, "clear sky"),
            raw("2025-05-28 06:00:00", 11.0, "clear sky"),
        ];
        let day = &summarize_samples(samples, 1)[0];
        // sorted: 00,03,06,12,21 -> indices 0,1,2,4
        assert_eq!(day.slot(SlotLabel::Night).temperature, 10.0);
        assert_eq!(day.slot(SlotLabel::Morning).temperature, 9.0);
        assert_eq!(day.slot(SlotLabel::Day).temperature, 11.0);
        assert_eq!(day.slot(SlotLabel::Evening).temperature, 12.0);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(10, 3)]
    fn test_truncation_keeps_min_days(#[case] days: u32, #[case] expected: usize) {
        let samples = vec![
            raw("2025-05-28 00:00:00", 1.0, "snow"),
            raw("2025-05-29 00:00:00", 2.0, "snow"),
            raw("2025-05-30 00:00:00", 3.0, "snow"),
        ];
        assert_eq!(summarize_samples(samples, days).len(), expected);
    }

    #[test]
    fn test_truncation_follows_encounter_order() {
        let samples = vec![
            raw("2025-05-30 00:00:00", 3.0, "fog"),
            raw("2025-05-28 00:00:00", 1.0, "fog"),
            raw("2025-05-30 03:00:00", 4.0, "fog"),
            raw("2025-05-29 00:00:00", 2.0, "fog"),
        ];
        let forecast = summarize_samples(samples, 2);
        let dates: Vec<NaiveDate> = forecast.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date("2025-05-30"), date("2025-05-28")]);
        assert_eq!(forecast[0].slot(SlotLabel::Night).temperature, 3.0);
        // [00:00, 03:00] padded with 00:00 -> Morning is 03:00, Evening is the repeat
        assert_eq!(forecast[0].slot(SlotLabel::Morning).temperature, 4.0);
        assert_eq!(forecast[0].slot(SlotLabel::Evening).temperature, 3.0);
    }

    #[test]
    fn test_group_keeps_raw_and_translated_description() {
        let grouped = group_by_date(vec![raw("2025-05-28 00:00:00", 1.0, "Overcast Clouds")]);
        let sample = &grouped[0].1[0];
        assert_eq!(sample.raw_description, "Overcast Clouds");
        assert_eq!(sample.description, "пасмурно");
        assert_eq!(sample.time, "00:00:00");
    }

    #[tokio::test]
    async fn test_service_returns_empty_on_provider_failure() {
        let service = ForecastService::new(Arc::new(FailingProvider));
        assert!(service.summarize("InvalidCity", 1).await.is_empty());
    }

    #[tokio::test]
    async fn test_service_summarizes_provider_samples() {
        let provider = StaticProvider(vec![
            raw("2025-05-28 00:00:00", 20.0, "clear sky"),
            raw("2025-05-29 00:00:00", 18.0, "thunderstorm"),
        ]);
        let service = ForecastService::new(Arc::new(provider));
        let forecast = service.summarize("Moscow", 5).await;
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[1].label, "05-29");
        assert_eq!(forecast[1].slot(SlotLabel::Day).description, "гроза");
    }
}
