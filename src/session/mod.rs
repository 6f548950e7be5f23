//! Voice session management
//!
//! This module provides the voice interaction controller and its pieces:
//! - `SessionState` / `SessionEvent` and the transition table
//! - `Session` and its ordered `Turn`s
//! - `VoiceController`, which sequences capture, transcription, dialogue and
//!   speech output for one meal-logging session at a time

mod controller;
mod session;
mod state;

pub use controller::{Collaborators, StateChange, VoiceController};
pub use session::{Session, Speaker, Turn, TurnOrderError};
pub use state::{SessionEvent, SessionState};
