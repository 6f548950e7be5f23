//! Meal results: the finalized nutrition estimate, its parser, satiety
//! helpers, personal targets and the in-memory meal log.

pub mod log;
pub mod parse;
pub mod satiety;
pub mod targets;
mod types;

pub use log::{DashboardStats, LoggedMeal, MacroTotals, MealLog, MealSink};
pub use parse::{meal_from_value, parse_finalize_reply, strip_code_fences};
pub use satiety::{satiety_color, HungerWindow, SatietyTier};
pub use targets::{progress_bars, BmiCategory, BodyStats, MacroTargets, ProgressBar};
pub use types::{FinalizedMeal, Insight, InsightKind};
