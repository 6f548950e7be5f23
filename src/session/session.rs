use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::SessionState;
use crate::meal::FinalizedMeal;

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// A single utterance in a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Speaker order of a complete conversation: utterance, question, answer.
const TURN_ORDER: [Speaker; 3] = [Speaker::User, Speaker::Assistant, Speaker::User];

/// Returned when a turn would break the user/assistant/user order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOrderError {
    pub expected: Option<Speaker>,
    pub got: Speaker,
}

/// One meal-logging attempt.
///
/// Sessions live only while the controller is away from `Idle`; they are
/// dropped (never persisted) when the controller returns there.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    turns: Vec<Turn>,
    result: Option<FinalizedMeal>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SessionState::Idle,
            turns: Vec::with_capacity(TURN_ORDER.len()),
            result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Speaker expected for the next turn, `None` once the conversation is complete
    pub fn expected_speaker(&self) -> Option<Speaker> {
        TURN_ORDER.get(self.turns.len()).copied()
    }

    pub fn push(&mut self, turn: Turn) -> Result<(), TurnOrderError> {
        let expected = self.expected_speaker();
        if expected != Some(turn.speaker) {
            return Err(TurnOrderError {
                expected,
                got: turn.speaker,
            });
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Whether all three turns have been collected
    pub fn is_complete(&self) -> bool {
        self.expected_speaker().is_none()
    }

    pub(crate) fn set_result(&mut self, meal: FinalizedMeal) {
        self.result = Some(meal);
    }

    pub(crate) fn take_result(&mut self) -> Option<FinalizedMeal> {
        self.result.take()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
