use serde::{Deserialize, Serialize};

use super::satiety::SatietyTier;

/// Tag of an insight line shown under a logged meal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    /// Something the meal does well
    Good,
    /// A genuine nutritional concern
    Warn,
    /// A concrete improvement
    Tip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub text: String,
}

/// Structured result of a completed session.
///
/// Field names match the finalize payload of the chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedMeal {
    /// Short meal name
    pub summary: String,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
    /// How long the meal keeps someone full, 0.0 to 1.0
    pub satiety_score: f64,
    /// Sentence(s) spoken back to the user
    pub voice_summary: String,
    pub insights: Vec<Insight>,
}

impl FinalizedMeal {
    pub fn satiety_tier(&self) -> SatietyTier {
        SatietyTier::from_score(self.satiety_score)
    }
}
