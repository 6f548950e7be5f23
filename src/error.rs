//! Error taxonomy for a voice meal-logging session.

use serde::Serialize;
use thiserror::Error;

use crate::session::{SessionEvent, SessionState, Speaker, TurnOrderError};

/// Prompt shown when the microphone cannot be opened.
pub const MICROPHONE_DENIED_MESSAGE: &str = "Microphone access needed";

/// Prompt shown for every other fatal failure.
pub const GENERIC_RETRY_MESSAGE: &str = "Something went wrong — tap to retry";

/// Errors raised by the collaborators a session depends on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    /// The user (or the platform) refused microphone access
    #[error("microphone access denied")]
    MicrophoneDenied,

    /// The capture device or stream failed
    #[error("capture error: {0}")]
    Capture(String),

    /// Speech-to-text failed or returned nothing usable
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The chat model could not be reached or rejected the request
    #[error("dialogue error: {0}")]
    Dialogue(String),

    /// The finalize reply could not be parsed into a meal
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Text-to-speech or playback failed; never fatal to a session
    #[error("speech output error: {0}")]
    SpeechOutput(String),

    /// The controller asked for a transition its table does not allow
    #[error("invalid transition: {event:?} in state {from:?}")]
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },

    /// A turn was appended out of the user/assistant/user order
    #[error("turn out of order: expected {expected:?}, got {got:?}")]
    TurnOrder {
        expected: Option<Speaker>,
        got: Speaker,
    },
}

impl From<TurnOrderError> for VoiceError {
    fn from(err: TurnOrderError) -> Self {
        Self::TurnOrder {
            expected: err.expected,
            got: err.got,
        }
    }
}

/// Coarse error kind, stable for logging and API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MicrophoneDenied,
    Capture,
    Transcription,
    Dialogue,
    MalformedResponse,
    SpeechOutput,
    Internal,
}

impl VoiceError {
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription(message.into())
    }

    pub fn dialogue(message: impl Into<String>) -> Self {
        Self::Dialogue(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn speech(message: impl Into<String>) -> Self {
        Self::SpeechOutput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MicrophoneDenied => ErrorKind::MicrophoneDenied,
            Self::Capture(_) => ErrorKind::Capture,
            Self::Transcription(_) => ErrorKind::Transcription,
            Self::Dialogue(_) => ErrorKind::Dialogue,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::SpeechOutput(_) => ErrorKind::SpeechOutput,
            Self::InvalidTransition { .. } | Self::TurnOrder { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error ends the session it occurred in
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SpeechOutput(_))
    }

    /// Message to show the user when this error ends a session
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MicrophoneDenied => MICROPHONE_DENIED_MESSAGE,
            _ => GENERIC_RETRY_MESSAGE,
        }
    }
}

/// Why `start_session` did not produce a meal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Another session holds the single session slot
    #[error("a meal log session is already in progress")]
    AlreadyInProgress,

    /// The session started and was aborted back to idle
    #[error("session aborted: {0}")]
    Aborted(#[from] VoiceError),
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress => "Already listening",
            Self::Aborted(err) => err.user_message(),
        }
    }
}
