//! Personal daily targets and progress bars.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::log::MacroTotals;

const ASSUMED_AGE_YEARS: f64 = 30.0;
const LIGHT_ACTIVITY: f64 = 1.375;
const SUGAR_LIMIT_G: u32 = 50;

/// Height and weight as entered by the user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyStats {
    pub height_in: f64,
    pub weight_lb: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("please enter a valid height (48–96 in) and weight (50–500 lb), got {height_in} in / {weight_lb} lb")]
pub struct InvalidBodyStats {
    pub height_in: f64,
    pub weight_lb: f64,
}

impl BodyStats {
    pub fn new(height_in: f64, weight_lb: f64) -> Result<Self, InvalidBodyStats> {
        let valid = (48.0..=96.0).contains(&height_in) && (50.0..=500.0).contains(&weight_lb);
        if !valid {
            return Err(InvalidBodyStats {
                height_in,
                weight_lb,
            });
        }
        Ok(Self {
            height_in,
            weight_lb,
        })
    }

    fn height_m(&self) -> f64 {
        self.height_in * 0.0254
    }

    fn weight_kg(&self) -> f64 {
        self.weight_lb * 0.453592
    }

    /// Body mass index, one decimal
    pub fn bmi(&self) -> f64 {
        let bmi = self.weight_kg() / self.height_m().powi(2);
        (bmi * 10.0).round() / 10.0
    }

    /// e.g. `5'10"  ·  160 lb  ·  BMI 23`
    pub fn display_line(&self) -> String {
        let feet = (self.height_in / 12.0).floor() as u32;
        let inches = (self.height_in % 12.0).round() as u32;
        format!(
            "{}'{}\"  ·  {} lb  ·  BMI {}",
            feet,
            inches,
            self.weight_lb.round(),
            self.bmi()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Healthy,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Healthy
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Healthy => "Healthy",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

/// Daily intake targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
    pub fiber_g: u32,
    pub sugar_g: u32,
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            calories: 2000,
            protein_g: 50,
            carbs_g: 250,
            fat_g: 78,
            fiber_g: 28,
            sugar_g: SUGAR_LIMIT_G,
        }
    }
}

impl MacroTargets {
    /// Mifflin-St Jeor BMR at a fixed age, scaled for light activity
    pub fn for_body(stats: &BodyStats) -> Self {
        let kg = stats.weight_kg();
        let cm = stats.height_m() * 100.0;
        let bmr = 10.0 * kg + 6.25 * cm - 5.0 * ASSUMED_AGE_YEARS + 5.0;
        let tdee = bmr * LIGHT_ACTIVITY;

        Self {
            calories: tdee.round() as u32,
            protein_g: (kg * 1.6).round() as u32,
            carbs_g: (tdee * 0.45 / 4.0).round() as u32,
            fat_g: (tdee * 0.30 / 9.0).round() as u32,
            fiber_g: (kg * 0.5).round() as u32,
            sugar_g: SUGAR_LIMIT_G,
        }
    }

    /// Targets for optional stats, falling back to defaults
    pub fn for_optional(stats: Option<&BodyStats>) -> Self {
        stats.map(Self::for_body).unwrap_or_default()
    }
}

/// One bar of the macro tracker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressBar {
    pub name: &'static str,
    pub consumed: f64,
    pub target: u32,
    /// 0..=100
    pub percent: f64,
    pub over_target: bool,
    /// e.g. `"42g / 116g"`
    pub label: String,
}

impl ProgressBar {
    pub fn new(name: &'static str, consumed: f64, target: u32, unit: &str) -> Self {
        let target_f = target as f64;
        let percent = if target > 0 {
            (consumed / target_f * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            name,
            consumed,
            target,
            percent,
            over_target: target > 0 && consumed > target_f,
            label: format!("{}{unit} / {}{unit}", consumed.round(), target),
        }
    }
}

/// Bars for protein, carbs, fat, fiber and calories
pub fn progress_bars(totals: &MacroTotals, targets: &MacroTargets) -> Vec<ProgressBar> {
    vec![
        ProgressBar::new("protein", totals.protein_g, targets.protein_g, "g"),
        ProgressBar::new("carbs", totals.carbs_g, targets.carbs_g, "g"),
        ProgressBar::new("fat", totals.fat_g, targets.fat_g, "g"),
        ProgressBar::new("fiber", totals.fiber_g, targets.fiber_g, "g"),
        ProgressBar::new("calories", totals.calories as f64, targets.calories, ""),
    ]
}
