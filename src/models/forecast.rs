//! Forecast samples and the daily four-slot summary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One provider sample (roughly every 3 hours)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Calendar date of the sample
    pub date: NaiveDate,
    /// Time of day as `HH:MM:SS`, compared lexicographically
    pub time: String,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Description as returned by the provider
    pub raw_description: String,
    /// Description after translation
    pub description: String,
    /// Provider icon code, e.g. `01d`
    pub icon: String,
}

/// Position of a slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotLabel {
    Night,
    Morning,
    Day,
    Evening,
}

impl SlotLabel {
    /// Labels in the order they are assigned to the selected indices
    pub const ALL: [SlotLabel; 4] = [
        SlotLabel::Night,
        SlotLabel::Morning,
        SlotLabel::Day,
        SlotLabel::Evening,
    ];

    /// Display name shown to visitors
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            SlotLabel::Night => "Ночь",
            SlotLabel::Morning => "Утро",
            SlotLabel::Day => "День",
            SlotLabel::Evening => "Вечер",
        }
    }
}

/// One labeled slot of a daily summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub label: SlotLabel,
    /// Name shown to visitors, e.g. `Ночь`
    pub name: String,
    pub temperature: f64,
    pub description: String,
    pub icon: String,
}

impl Slot {
    #[must_use]
    pub fn from_sample(label: SlotLabel, sample: &ForecastSample) -> Self {
        Self {
            label,
            name: label.display_name().to_string(),
            temperature: sample.temperature,
            description: sample.description.clone(),
            icon: sample.icon.clone(),
        }
    }
}

/// Reduced representation of one forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Short `MM-DD` label used by the page
    pub label: String,
    pub slots: [Slot; 4],
}

impl DailySummary {
    #[must_use]
    pub fn new(date: NaiveDate, slots: [Slot; 4]) -> Self {
        Self {
            date,
            label: date.format("%m-%d").to_string(),
            slots,
        }
    }

    #[must_use]
    pub fn slot(&self, label: SlotLabel) -> &Slot {
        // slots are always stored in `SlotLabel::ALL` order
        &self.slots[label as usize]
    }
}

/// Daily summaries in the order their dates were first seen
pub type Forecast = Vec<DailySummary>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(temp: f64) -> ForecastSample {
        ForecastSample {
            date: NaiveDate::from_ymd_opt(2025, 5, 28).unwrap(),
            time: "00:00:00".to_string(),
            temperature: temp,
            raw_description: "clear sky".to_string(),
            description: "ясное небо".to_string(),
            icon: "01d".to_string(),
        }
    }

    #[test]
    fn test_summary_label_is_month_day() {
        let s = sample(20.0);
        let slots = SlotLabel::ALL.map(|label| Slot::from_sample(label, &s));
        let summary = DailySummary::new(s.date, slots);
        assert_eq!(summary.label, "05-28");
        assert_eq!(summary.slot(SlotLabel::Day).label, SlotLabel::Day);
        assert_eq!(summary.slot(SlotLabel::Evening).temperature, 20.0);
    }

    #[test]
    fn test_slot_carries_display_name() {
        let s = sample(-3.2);
        let names: Vec<String> = SlotLabel::ALL
            .map(|label| Slot::from_sample(label, &s).name)
            .into_iter()
            .collect();
        assert_eq!(names, vec!["Ночь", "Утро", "День", "Вечер"]);

        let json = serde_json::to_value(Slot::from_sample(SlotLabel::Day, &s)).unwrap();
        assert_eq!(json["label"], "Day");
        assert_eq!(json["name"], "День");
    }
}
