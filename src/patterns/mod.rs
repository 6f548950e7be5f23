//! Patterns analytics over the static meal history
//!
//! - `WeeklyGrid`: satiety heatmap (time band x weekday) for the current week
//! - `MonthCalendar`: per-day meal dots and craving badges for a month
//! - `DayDetail`: totals and macro split for one day
//! - `insights`: craving windows, Saturday rhythm, best streak, macro gap

mod history;
mod insights;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::meal::SatietyTier;
pub use history::{MealHistory, MealRecord, TimeBand, BUNDLED_TODAY};
pub use insights::{
    best_streak, craving_windows, macro_gap, saturday_rhythm, CravingWindows, InsightCategory,
    MacroGap, PatternInsight, SaturdayRhythm, Streak,
};

use history::average;

const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const CALENDAR_DOTS: usize = 3;

/// One heatmap cell
#[derive(Debug, Clone, Serialize)]
pub struct HeatCell {
    pub date: NaiveDate,
    pub day: &'static str,
    pub band: TimeBand,
    /// `None` when nothing was eaten in this window
    pub average_satiety: Option<f64>,
    pub percent: Option<u32>,
    pub tier: Option<SatietyTier>,
    pub has_craving: bool,
    pub meals: Vec<String>,
}

/// A named heatmap window and its average satiety
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyGrid {
    pub week_start: NaiveDate,
    pub dates: Vec<NaiveDate>,
    /// Rows by band (morning first), each with seven cells Monday first
    pub rows: Vec<Vec<HeatCell>>,
    pub weakest: Option<WindowScore>,
    pub strongest: Option<WindowScore>,
    pub meal_count: usize,
}

impl WeeklyGrid {
    pub fn cell(&self, band: TimeBand, weekday: Weekday) -> Option<&HeatCell> {
        let row = TimeBand::ALL.iter().position(|b| *b == band)?;
        self.rows
            .get(row)?
            .get(weekday.num_days_from_monday() as usize)
    }

    /// `"Your weakest window is Sat afternoons. Strongest: Mon mornings."`
    pub fn summary(&self) -> Option<String> {
        match (&self.weakest, &self.strongest) {
            (Some(weak), Some(strong)) => Some(format!(
                "Your weakest window is {}. Strongest: {}.",
                weak.label, strong.label
            )),
            _ => None,
        }
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Heatmap for the Monday-to-Sunday week containing `date`
pub fn weekly_grid(history: &MealHistory, date: NaiveDate) -> WeeklyGrid {
    let start = week_start(date);
    let dates: Vec<NaiveDate> = (0..7).map(|i| start + Duration::days(i)).collect();

    let mut weakest: Option<WindowScore> = None;
    let mut strongest: Option<WindowScore> = None;
    let mut meal_count = 0;
    let mut rows = Vec::with_capacity(TimeBand::ALL.len());

    for band in TimeBand::ALL {
        let mut row = Vec::with_capacity(7);
        for (index, day) in dates.iter().enumerate() {
            let meals: Vec<&MealRecord> = history
                .records()
                .iter()
                .filter(|r| r.date == *day && TimeBand::for_hour(r.time_hour) == band)
                .collect();
            meal_count += meals.len();

            let average_satiety =
                (!meals.is_empty()).then(|| average(meals.iter().map(|m| m.satiety_score)));

            if let Some(score) = average_satiety {
                let label = format!("{} {}s", DAY_LABELS[index], band.label().to_lowercase());
                if weakest.as_ref().map_or(true, |w| score < w.score) {
                    weakest = Some(WindowScore {
                        label: label.clone(),
                        score,
                    });
                }
                if strongest.as_ref().map_or(true, |s| score > s.score) {
                    strongest = Some(WindowScore { label, score });
                }
            }

            row.push(HeatCell {
                date: *day,
                day: DAY_LABELS[index],
                band,
                average_satiety,
                percent: average_satiety.map(percent),
                tier: average_satiety.map(SatietyTier::from_score),
                has_craving: meals.iter().any(|m| m.craving),
                meals: meals.iter().map(|m| m.meal.clone()).collect(),
            });
        }
        rows.push(row);
    }

    WeeklyGrid {
        week_start: start,
        dates,
        rows,
        weakest,
        strongest,
        meal_count,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub meal_count: usize,
    pub has_craving: bool,
    /// Tiers of the first three meals
    pub dots: Vec<SatietyTier>,
    /// Meals beyond the shown dots
    pub more: usize,
    pub weekend: bool,
    pub today: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    /// Empty cells before day 1 in a Monday-first grid
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Calendar for `year`/`month`; `None` for an invalid month
pub fn month_calendar(history: &MealHistory, year: i32, month: u32) -> Option<MonthCalendar> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    let grouped = history.by_date();
    let days = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|date| {
            let meals = grouped.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            CalendarDay {
                date,
                meal_count: meals.len(),
                has_craving: meals.iter().any(|m| m.craving),
                dots: meals.iter().take(CALENDAR_DOTS).map(|m| m.tier()).collect(),
                more: meals.len().saturating_sub(CALENDAR_DOTS),
                weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                today: date == history.today(),
            }
        })
        .collect();

    Some(MonthCalendar {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_monday(),
        days,
    })
}

/// One day's meals, totals and macro split
#[derive(Debug, Clone, Serialize)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub title: String,
    pub meals: Vec<MealRecord>,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub sugar_g: f64,
    /// Share of macro grams, 33/34/33 when nothing was eaten
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
    pub has_craving: bool,
}

pub fn day_detail(history: &MealHistory, date: NaiveDate) -> DayDetail {
    let meals: Vec<MealRecord> = history.on(date).into_iter().cloned().collect();

    let calories = meals.iter().map(|m| m.calories).sum();
    let protein_g: f64 = meals.iter().map(|m| m.protein_g).sum();
    let carbs_g: f64 = meals.iter().map(|m| m.carbs_g).sum();
    let fat_g: f64 = meals.iter().map(|m| m.fat_g).sum();
    let sugar_g = meals.iter().map(|m| m.sugar_g).sum();

    let macro_total = protein_g + carbs_g + fat_g;
    let (protein_pct, carbs_pct, fat_pct) = if macro_total > 0.0 {
        (
            protein_g / macro_total * 100.0,
            carbs_g / macro_total * 100.0,
            fat_g / macro_total * 100.0,
        )
    } else {
        (33.0, 34.0, 33.0)
    };

    DayDetail {
        date,
        title: date.format("%A, %B %-d").to_string(),
        has_craving: meals.iter().any(|m| m.craving),
        meals,
        calories,
        protein_g,
        carbs_g,
        fat_g,
        sugar_g,
        protein_pct,
        carbs_pct,
        fat_pct,
    }
}

/// Everything the patterns view shows
#[derive(Debug, Clone, Serialize)]
pub struct PatternsReport {
    pub today: NaiveDate,
    pub weekly: WeeklyGrid,
    pub weekly_summary: Option<String>,
    pub calendar: Option<MonthCalendar>,
    pub insights: Vec<PatternInsight>,
}

impl PatternsReport {
    pub fn build(history: &MealHistory) -> Self {
        let today = history.today();
        let weekly = weekly_grid(history, today);
        Self {
            today,
            weekly_summary: weekly.summary(),
            weekly,
            calendar: month_calendar(history, today.year(), today.month()),
            insights: insights::insights(history),
        }
    }
}

fn percent(score: f64) -> u32 {
    (score * 100.0).round().max(0.0) as u32
}
