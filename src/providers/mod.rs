//! Collaborator capabilities the controller and the HTTP proxy depend on,
//! and their vendor-backed implementations.
//!
//! - `Transcriber`: speech-to-text (ElevenLabs)
//! - `SpeechSynthesizer` / `VoiceCatalog`: text-to-speech and voices (ElevenLabs)
//! - `ChatModel`: raw chat completion (Gemini)
//! - `Dialogue`: clarify/finalize phases on top of any `ChatModel`

pub mod dialogue;
pub mod elevenlabs;
pub mod gemini;
mod prompts;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioClip, SpeechAudio};
use crate::error::VoiceError;
use crate::meal::FinalizedMeal;
use crate::session::{Speaker, Turn};

pub use dialogue::ModelDialogue;
pub use elevenlabs::{resolve_voice_id, ElevenLabsClient, VoiceOption};
pub use gemini::GeminiClient;
pub use prompts::PREVIEW_TEXT;

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError>;
}

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with `voice_id`, or the configured default voice
    async fn synthesize(&self, text: &str, voice_id: Option<&str>)
        -> Result<SpeechAudio, VoiceError>;
}

#[async_trait::async_trait]
pub trait VoiceCatalog: Send + Sync {
    async fn list_voices(&self) -> Result<Vec<VoiceOption>, VoiceError>;
}

/// Which conversation step a chat request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatPhase {
    /// Ask one clarifying question about the meal
    Clarify,
    /// Produce the structured nutrition estimate
    Finalize,
}

impl ChatPhase {
    pub fn system_prompt(self) -> &'static str {
        match self {
            ChatPhase::Clarify => prompts::CLARIFY_PROMPT,
            ChatPhase::Finalize => prompts::FINALIZE_PROMPT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.speaker() {
            Speaker::User => ChatRole::User,
            Speaker::Assistant => ChatRole::Assistant,
        };
        Self {
            role,
            content: turn.text().to_string(),
        }
    }
}

/// A hosted chat model answering under a phase-specific system prompt
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model's raw text reply to the last message of `messages`
    async fn complete(&self, phase: ChatPhase, messages: &[ChatMessage])
        -> Result<String, VoiceError>;
}

/// The conversation steps the controller needs
#[async_trait::async_trait]
pub trait Dialogue: Send + Sync {
    async fn ask_clarifying_question(&self, utterance: &str) -> Result<String, VoiceError>;

    /// Turn the whole conversation into a meal. Fails with `Dialogue` when
    /// the model cannot be reached and `MalformedResponse` when its reply
    /// does not parse.
    async fn finalize(&self, turns: &[Turn]) -> Result<FinalizedMeal, VoiceError>;
}
