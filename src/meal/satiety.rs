//! Satiety tiers, colours and hunger-return windows.

use serde::{Deserialize, Serialize};
use std::fmt;

const LOW_MAX: f64 = 0.35;
const MID_MAX: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatietyTier {
    Low,
    Mid,
    High,
}

impl SatietyTier {
    /// `low` below 0.35, `mid` below 0.65, `high` otherwise.
    /// Depends on the score alone; NaN counts as `low`.
    pub fn from_score(score: f64) -> Self {
        if score >= MID_MAX {
            SatietyTier::High
        } else if score >= LOW_MAX {
            SatietyTier::Mid
        } else {
            SatietyTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SatietyTier::Low => "low",
            SatietyTier::Mid => "mid",
            SatietyTier::High => "high",
        }
    }

    /// Accent colour for cards and pills
    pub fn color(self) -> &'static str {
        match self {
            SatietyTier::High => "#20B8CD",
            SatietyTier::Mid => "#E8A838",
            SatietyTier::Low => "#E05C5C",
        }
    }
}

impl fmt::Display for SatietyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const GRADIENT_LOW: [f64; 3] = [217.0, 64.0, 64.0];
const GRADIENT_MID: [f64; 3] = [232.0, 168.0, 56.0];
const GRADIENT_HIGH: [f64; 3] = [32.0, 184.0, 205.0];

/// Body-fill colour for a satiety level: red at 0, amber at 0.5, teal at 1.
pub fn satiety_color(score: f64) -> [u8; 3] {
    let t = score.clamp(0.0, 1.0);
    let (from, to, u) = if t < 0.5 {
        (GRADIENT_LOW, GRADIENT_MID, t / 0.5)
    } else {
        (GRADIENT_MID, GRADIENT_HIGH, (t - 0.5) / 0.5)
    };
    let mut rgb = [0u8; 3];
    for i in 0..3 {
        rgb[i] = (from[i] + (to[i] - from[i]) * u).round() as u8;
    }
    rgb
}

/// Expected time until hunger returns, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HungerWindow {
    pub min_minutes: u32,
    /// `None` for "or longer"
    pub max_minutes: Option<u32>,
}

impl HungerWindow {
    pub fn for_score(score: f64) -> Self {
        let (min_minutes, max_minutes) = if score < 0.25 {
            (45, Some(90))
        } else if score < 0.45 {
            (90, Some(150))
        } else if score < 0.65 {
            (150, Some(210))
        } else if score < 0.80 {
            (210, Some(300))
        } else {
            (300, None)
        };
        Self {
            min_minutes,
            max_minutes,
        }
    }
}

impl fmt::Display for HungerWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = |m: u32| m as f64 / 60.0;
        match self.max_minutes {
            Some(max) if max <= 90 => write!(f, "{}–{} minutes", self.min_minutes, max),
            Some(max) => write!(f, "{}–{} hours", hours(self.min_minutes), hours(max)),
            None => write!(f, "{}+ hours", hours(self.min_minutes)),
        }
    }
}
