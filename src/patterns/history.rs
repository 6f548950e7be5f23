use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::meal::SatietyTier;

const BUNDLED_HISTORY: &str = include_str!("../../data/meal_history.json");

/// "Today" for the bundled history
pub const BUNDLED_TODAY: &str = "2026-02-22";

/// One historical meal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub date: NaiveDate,
    /// Hour of day, 0-23
    pub time_hour: u32,
    pub meal: String,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub sugar_g: f64,
    pub satiety_score: f64,
    pub craving: bool,
}

impl MealRecord {
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn tier(&self) -> SatietyTier {
        SatietyTier::from_score(self.satiety_score)
    }

    /// `"8am"`, `"12pm"`, `"10pm"`
    pub fn hour_label(&self) -> String {
        match self.time_hour {
            0 => "12am".to_string(),
            h @ 1..=11 => format!("{h}am"),
            12 => "12pm".to_string(),
            h => format!("{}pm", h - 12),
        }
    }
}

/// Part of the day a meal falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBand {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBand {
    pub const ALL: [TimeBand; 4] = [
        TimeBand::Morning,
        TimeBand::Afternoon,
        TimeBand::Evening,
        TimeBand::Night,
    ];

    /// Morning 6-10, afternoon 11-16, evening 17-20, night otherwise
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            6..=10 => TimeBand::Morning,
            11..=16 => TimeBand::Afternoon,
            17..=20 => TimeBand::Evening,
            _ => TimeBand::Night,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeBand::Morning => "Morning",
            TimeBand::Afternoon => "Afternoon",
            TimeBand::Evening => "Evening",
            TimeBand::Night => "Night",
        }
    }
}

/// Static, already-clean meal history the patterns view is computed from
#[derive(Debug, Clone)]
pub struct MealHistory {
    records: Vec<MealRecord>,
    today: NaiveDate,
}

impl MealHistory {
    /// The 30-day history shipped with the crate
    pub fn bundled() -> Result<Self> {
        let today = NaiveDate::parse_from_str(BUNDLED_TODAY, "%Y-%m-%d")
            .context("Invalid bundled today date")?;
        Self::from_json(BUNDLED_HISTORY, today)
    }

    pub fn from_json(json: &str, today: NaiveDate) -> Result<Self> {
        let records: Vec<MealRecord> =
            serde_json::from_str(json).context("Failed to parse meal history")?;
        Ok(Self::new(records, today))
    }

    pub fn new(records: Vec<MealRecord>, today: NaiveDate) -> Self {
        Self { records, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn records(&self) -> &[MealRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn on(&self, date: NaiveDate) -> Vec<&MealRecord> {
        self.records.iter().filter(|r| r.date == date).collect()
    }

    /// Records grouped by date, in date order
    pub fn by_date(&self) -> BTreeMap<NaiveDate, Vec<&MealRecord>> {
        let mut grouped: BTreeMap<NaiveDate, Vec<&MealRecord>> = BTreeMap::new();
        for record in &self.records {
            grouped.entry(record.date).or_default().push(record);
        }
        grouped
    }
}

pub(crate) fn average(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
