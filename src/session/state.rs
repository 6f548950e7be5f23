use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the voice controller.
///
/// `Idle` is both the initial and the terminal state: every session, whether
/// it commits a meal or aborts, ends back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    /// Capturing the first utterance
    Listening,
    TranscribingFirst,
    /// Waiting for the clarifying question from the chat model
    AwaitingQuestion,
    SpeakingQuestion,
    /// Capturing the answer to the clarifying question
    ListeningAnswer,
    TranscribingAnswer,
    Finalizing,
    SpeakingResult,
}

/// Something that happened to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    StartRequested,
    /// The capture source ended on its own and yielded audio
    AudioCaptured,
    /// The user stopped the capture early
    StopRequested,
    TranscriptReceived,
    QuestionReceived,
    PlaybackFinished,
    /// Speech output failed; treated like a finished playback
    SpeechFailed,
    ResultReceived,
    /// An unrecoverable error aborted the session
    Failed,
    /// The session's caller went away before it finished
    Cancelled,
}

impl SessionState {
    /// Transition table. Returns `None` when `event` is not valid in `self`.
    pub fn next(self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Idle, E::StartRequested) => Some(S::Listening),
            (S::Idle, _) => None,

            (_, E::Failed | E::Cancelled) => Some(S::Idle),

            (S::Listening, E::AudioCaptured | E::StopRequested) => Some(S::TranscribingFirst),
            (S::Listening, _) => None,

            (S::TranscribingFirst, E::TranscriptReceived) => Some(S::AwaitingQuestion),
            (S::TranscribingFirst, _) => None,

            (S::AwaitingQuestion, E::QuestionReceived) => Some(S::SpeakingQuestion),
            (S::AwaitingQuestion, _) => None,

            (S::SpeakingQuestion, E::PlaybackFinished | E::SpeechFailed) => {
                Some(S::ListeningAnswer)
            }
            (S::SpeakingQuestion, _) => None,

            (S::ListeningAnswer, E::AudioCaptured | E::StopRequested) => {
                Some(S::TranscribingAnswer)
            }
            (S::ListeningAnswer, _) => None,

            (S::TranscribingAnswer, E::TranscriptReceived) => Some(S::Finalizing),
            (S::TranscribingAnswer, _) => None,

            (S::Finalizing, E::ResultReceived) => Some(S::SpeakingResult),
            (S::Finalizing, _) => None,

            (S::SpeakingResult, E::PlaybackFinished | E::SpeechFailed) => Some(S::Idle),
            (S::SpeakingResult, _) => None,
        }
    }

    pub fn is_idle(self) -> bool {
        self == SessionState::Idle
    }

    /// Whether a recording is expected to be running in this state
    pub fn is_listening(self) -> bool {
        matches!(self, SessionState::Listening | SessionState::ListeningAnswer)
    }

    /// Human-readable label, e.g. `"awaiting question"`
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::TranscribingFirst => "transcribing",
            SessionState::AwaitingQuestion => "awaiting question",
            SessionState::SpeakingQuestion => "speaking question",
            SessionState::ListeningAnswer => "listening answer",
            SessionState::TranscribingAnswer => "transcribing answer",
            SessionState::Finalizing => "finalizing",
            SessionState::SpeakingResult => "speaking result",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
