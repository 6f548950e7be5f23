use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;
use tracing::info;

use super::satiety::{satiety_color, SatietyTier};
use super::types::FinalizedMeal;

/// Receives each finalized meal exactly once, when its session commits.
pub trait MealSink: Send + Sync {
    fn commit(&self, meal: FinalizedMeal);
}

/// A committed meal with the time it was logged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedMeal {
    pub meal: FinalizedMeal,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
}

impl MacroTotals {
    pub fn add(&mut self, meal: &FinalizedMeal) {
        self.calories += meal.calories;
        self.protein_g += meal.protein_g;
        self.carbs_g += meal.carbs_g;
        self.fat_g += meal.fat_g;
        self.sugar_g += meal.sugar_g;
        self.fiber_g += meal.fiber_g;
    }
}

/// Numbers behind the dashboard pills and body figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub meal_count: usize,
    pub totals: MacroTotals,
    /// Mean satiety over logged meals, 0.0 when none
    pub average_satiety: f64,
    pub satiety_percent: u32,
    pub tier: Option<SatietyTier>,
    /// Body-fill colour for `average_satiety`
    pub fill_rgb: [u8; 3],
}

/// In-memory meal history for the running process
#[derive(Debug, Default)]
pub struct MealLog {
    meals: RwLock<Vec<LoggedMeal>>,
}

impl MealLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first, as cards are shown
    pub fn meals(&self) -> Vec<LoggedMeal> {
        match self.meals.read() {
            Ok(meals) => meals.iter().rev().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().rev().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.meals.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn totals(&self) -> MacroTotals {
        let mut totals = MacroTotals::default();
        for logged in self.meals() {
            totals.add(&logged.meal);
        }
        totals
    }

    pub fn stats(&self) -> DashboardStats {
        let meals = self.meals();
        let totals = self.totals();
        let average_satiety = if meals.is_empty() {
            0.0
        } else {
            meals.iter().map(|m| m.meal.satiety_score).sum::<f64>() / meals.len() as f64
        };

        DashboardStats {
            meal_count: meals.len(),
            totals,
            average_satiety,
            satiety_percent: (average_satiety * 100.0).round() as u32,
            tier: (!meals.is_empty()).then(|| SatietyTier::from_score(average_satiety)),
            fill_rgb: satiety_color(average_satiety),
        }
    }
}

impl MealSink for MealLog {
    fn commit(&self, meal: FinalizedMeal) {
        info!(
            "Meal logged: {} ({} kcal, satiety {:.2})",
            meal.summary, meal.calories, meal.satiety_score
        );
        let logged = LoggedMeal {
            meal,
            logged_at: Utc::now(),
        };
        match self.meals.write() {
            Ok(mut meals) => meals.push(logged),
            Err(poisoned) => poisoned.into_inner().push(logged),
        }
    }
}
