use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use super::history::{average, MealHistory, MealRecord};

/// A day counts toward a streak when its meals average at least this
const STREAK_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    TimePattern,
    WeeklyRhythm,
    BestStreak,
    MacroGap,
}

impl InsightCategory {
    pub fn title(self) -> &'static str {
        match self {
            InsightCategory::TimePattern => "Time Pattern",
            InsightCategory::WeeklyRhythm => "Weekly Rhythm",
            InsightCategory::BestStreak => "Best Streak",
            InsightCategory::MacroGap => "Macro Gap",
        }
    }
}

/// One insight card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternInsight {
    pub category: InsightCategory,
    pub title: &'static str,
    pub stat: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CravingWindows {
    pub total: usize,
    /// Share of cravings logged 21:00-02:59
    pub night_percent: u32,
    /// Share of cravings logged 14:00-16:59
    pub afternoon_percent: u32,
}

pub fn craving_windows(history: &MealHistory) -> CravingWindows {
    let cravings: Vec<&MealRecord> = history.records().iter().filter(|m| m.craving).collect();
    let night = cravings
        .iter()
        .filter(|m| m.time_hour >= 21 || m.time_hour <= 2)
        .count();
    let afternoon = cravings
        .iter()
        .filter(|m| (14..=16).contains(&m.time_hour))
        .count();

    CravingWindows {
        total: cravings.len(),
        night_percent: share(night, cravings.len()),
        afternoon_percent: share(afternoon, cravings.len()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SaturdayRhythm {
    pub saturday_average: f64,
    pub weekday_average: f64,
    /// Rounded Saturday minus weekday average daily calories
    pub difference: i64,
}

pub fn saturday_rhythm(history: &MealHistory) -> SaturdayRhythm {
    let mut daily: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for record in history.records() {
        *daily.entry(record.date).or_default() += record.calories;
    }

    let saturday_average = average(
        daily
            .iter()
            .filter(|(d, _)| d.weekday() == Weekday::Sat)
            .map(|(_, c)| f64::from(*c)),
    );
    let weekday_average = average(
        daily
            .iter()
            .filter(|(d, _)| d.weekday().num_days_from_monday() < 5)
            .map(|(_, c)| f64::from(*c)),
    );

    SaturdayRhythm {
        saturday_average,
        weekday_average,
        difference: (saturday_average - weekday_average).round() as i64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Streak {
    pub days: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Streak {
    /// `"Feb 1–5"`
    pub fn range_label(&self) -> Option<String> {
        let (start, end) = (self.start?, self.end?);
        Some(format!("{}–{}", start.format("%b %-d"), end.day()))
    }
}

/// Longest run of consecutive logged days whose average satiety is at
/// least 0.65. The earliest run wins a tie.
pub fn best_streak(history: &MealHistory) -> Streak {
    let mut best = Streak {
        days: 0,
        start: None,
        end: None,
    };
    let mut current = 0;
    let mut current_start = None;

    for (date, meals) in history.by_date() {
        if average(meals.iter().map(|m| m.satiety_score)) >= STREAK_THRESHOLD {
            if current == 0 {
                current_start = Some(date);
            }
            current += 1;
            if current > best.days {
                best = Streak {
                    days: current,
                    start: current_start,
                    end: Some(date),
                };
            }
        } else {
            current = 0;
        }
    }

    best
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroGap {
    /// Rounded average protein of weekday breakfasts (06-11h)
    pub weekday_morning_protein: i64,
    pub weekend_morning_protein: i64,
    pub protein_drop_percent: i64,
    /// Rounded average carbs of Friday evenings (17-23h)
    pub friday_evening_carbs: i64,
    /// Same, Monday to Thursday
    pub weeknight_carbs: i64,
    pub carb_spike_percent: i64,
}

pub fn macro_gap(history: &MealHistory) -> MacroGap {
    let records = history.records();
    let morning = |m: &&MealRecord| (6..=11).contains(&m.time_hour);
    let evening = |m: &&MealRecord| (17..=23).contains(&m.time_hour);

    let weekday_morning_protein = round(average(
        records
            .iter()
            .filter(|m| !m.is_weekend())
            .filter(morning)
            .map(|m| m.protein_g),
    ));
    let weekend_morning_protein = round(average(
        records
            .iter()
            .filter(|m| m.is_weekend())
            .filter(morning)
            .map(|m| m.protein_g),
    ));
    let friday_evening_carbs = round(average(
        records
            .iter()
            .filter(|m| m.weekday() == Weekday::Fri)
            .filter(evening)
            .map(|m| m.carbs_g),
    ));
    let weeknight_carbs = round(average(
        records
            .iter()
            .filter(|m| m.weekday().num_days_from_monday() < 4)
            .filter(evening)
            .map(|m| m.carbs_g),
    ));

    MacroGap {
        weekday_morning_protein,
        weekend_morning_protein,
        protein_drop_percent: percent_of(
            weekday_morning_protein - weekend_morning_protein,
            weekday_morning_protein,
        ),
        friday_evening_carbs,
        weeknight_carbs,
        carb_spike_percent: percent_of(friday_evening_carbs - weeknight_carbs, weeknight_carbs),
    }
}

/// The four insight cards
pub fn insights(history: &MealHistory) -> Vec<PatternInsight> {
    let cravings = craving_windows(history);
    let rhythm = saturday_rhythm(history);
    let streak = best_streak(history);
    let gap = macro_gap(history);

    let rhythm_text = if rhythm.difference > 0 {
        format!(
            "Saturdays average {} more calories than weekdays ({} vs {} kcal). Social eating and dinner-out habits drive the gap.",
            rhythm.difference,
            rhythm.saturday_average.round(),
            rhythm.weekday_average.round()
        )
    } else {
        format!(
            "Your Saturday intake is well-controlled, averaging {} fewer kcal than weekdays.",
            rhythm.difference.abs()
        )
    };

    let carb_note = if gap.carb_spike_percent > 0 {
        format!("{}% above", gap.carb_spike_percent)
    } else {
        "similar to".to_string()
    };

    vec![
        card(
            InsightCategory::TimePattern,
            format!("{}%", cravings.night_percent),
            format!(
                "{}% of your cravings happen between 9–11pm. Afternoons (2–4pm) account for another {}%. Late nights are your highest-risk window.",
                cravings.night_percent, cravings.afternoon_percent
            ),
        ),
        card(
            InsightCategory::WeeklyRhythm,
            format!("+{} kcal", rhythm.difference.abs()),
            rhythm_text,
        ),
        card(
            InsightCategory::BestStreak,
            format!("{} days", streak.days),
            match streak.range_label() {
                Some(range) => format!(
                    "Your best satiety streak was {} consecutive days: {}. Every meal in that window averaged above 65% satiety.",
                    streak.days, range
                ),
                None => "No day has averaged 65% satiety yet.".to_string(),
            },
        ),
        card(
            InsightCategory::MacroGap,
            format!("−{}%", gap.protein_drop_percent),
            format!(
                "Weekend morning protein drops {}% vs weekdays ({}g vs {}g). Friday evenings average {}g carbs, {} other weeknight dinners.",
                gap.protein_drop_percent,
                gap.weekend_morning_protein,
                gap.weekday_morning_protein,
                gap.friday_evening_carbs,
                carb_note
            ),
        ),
    ]
}

fn card(category: InsightCategory, stat: String, text: String) -> PatternInsight {
    PatternInsight {
        category,
        title: category.title(),
        stat,
        text,
    }
}

fn share(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64 * 100.0).round() as u32
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

fn percent_of(delta: i64, base: i64) -> i64 {
    if base == 0 {
        return 0;
    }
    (delta as f64 / base as f64 * 100.0).round() as i64
}
