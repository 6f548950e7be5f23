//! Parsing of the finalize reply into a `FinalizedMeal`.
//!
//! The chat model is asked for a bare JSON object but sometimes wraps it in a
//! Markdown fence. Anything that does not deserialize into the full shape, or
//! carries out-of-range numbers, is rejected as `MalformedResponse`.

use serde::Deserialize;

use super::types::{FinalizedMeal, Insight};
use crate::error::VoiceError;

/// Remove accidental ```json fences and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
        rest = rest.trim_start();
    }
    out.push_str(rest);
    out.trim().to_string()
}

// Numbers arrive as JSON floats even when integers are requested.
#[derive(Deserialize)]
struct RawMeal {
    summary: String,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
    sugar_g: f64,
    fiber_g: f64,
    satiety_score: f64,
    voice_summary: String,
    insights: Vec<Insight>,
}

pub fn parse_finalize_reply(raw: &str) -> Result<FinalizedMeal, VoiceError> {
    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| VoiceError::malformed(format!("finalize reply is not JSON: {e}")))?;
    meal_from_value(value)
}

/// Validate an already-decoded finalize payload
pub fn meal_from_value(value: serde_json::Value) -> Result<FinalizedMeal, VoiceError> {
    let raw: RawMeal = serde_json::from_value(value)
        .map_err(|e| VoiceError::malformed(format!("finalize payload has wrong shape: {e}")))?;

    if raw.summary.trim().is_empty() {
        return Err(VoiceError::malformed("summary is empty"));
    }
    if raw.voice_summary.trim().is_empty() {
        return Err(VoiceError::malformed("voice_summary is empty"));
    }
    if !(0.0..=1.0).contains(&raw.satiety_score) {
        return Err(VoiceError::malformed(format!(
            "satiety_score {} outside [0, 1]",
            raw.satiety_score
        )));
    }
    if !raw.calories.is_finite() || raw.calories < 0.0 || raw.calories > u32::MAX as f64 {
        return Err(VoiceError::malformed(format!(
            "calories {} out of range",
            raw.calories
        )));
    }

    let macros = [
        ("protein_g", raw.protein_g),
        ("carbs_g", raw.carbs_g),
        ("fat_g", raw.fat_g),
        ("sugar_g", raw.sugar_g),
        ("fiber_g", raw.fiber_g),
    ];
    if let Some((name, grams)) = macros
        .iter()
        .find(|(_, grams)| !grams.is_finite() || *grams < 0.0)
    {
        return Err(VoiceError::malformed(format!("{name} {grams} out of range")));
    }

    if let Some(empty) = raw.insights.iter().position(|i| i.text.trim().is_empty()) {
        return Err(VoiceError::malformed(format!("insight {empty} has no text")));
    }

    Ok(FinalizedMeal {
        summary: raw.summary.trim().to_string(),
        calories: raw.calories.round() as u32,
        protein_g: raw.protein_g,
        carbs_g: raw.carbs_g,
        fat_g: raw.fat_g,
        sugar_g: raw.sugar_g,
        fiber_g: raw.fiber_g,
        satiety_score: raw.satiety_score,
        voice_summary: raw.voice_summary.trim().to_string(),
        insights: raw.insights,
    })
}
