use std::time::{Duration, Instant};

use super::signal::{stop_pair, StopSignal, StopTrigger};
use crate::error::VoiceError;

/// Encoded audio produced by one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Encoded bytes (WAV, WebM, ...), forwarded untouched to speech-to-text
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// Length of the recording, when the source knows it
    pub duration_ms: Option<u64>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name used when uploading the clip
    pub fn file_name(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => "audio.wav",
            "audio/ogg" => "audio.ogg",
            "audio/mpeg" => "audio.mp3",
            _ => "audio.webm",
        }
    }
}

/// Audio capture capability
///
/// Implementations:
/// - `WavFileCapture`: replays prerecorded WAV files (CLI, batch runs)
/// - test doubles driven by channels
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Record one utterance.
    ///
    /// Resolves when the source ends on its own, or as soon as `stop` fires
    /// with whatever was captured so far. The underlying stream must be
    /// closed before this returns (or when the future is dropped).
    ///
    /// Fails with `MicrophoneDenied` when access is refused and `Capture`
    /// for any other device/stream failure.
    async fn capture(&self, stop: StopSignal) -> Result<AudioClip, VoiceError>;

    /// Get capture source name for logging
    fn name(&self) -> &str;
}

/// One in-progress recording, owned by the controller for a single record step.
///
/// Dropping the handle releases the recording: the paired `StopSignal`
/// fires, which makes the capture resolve and close its stream.
#[derive(Debug)]
pub struct RecordingHandle {
    id: u64,
    trigger: StopTrigger,
    started_at: Instant,
    stop_requested: bool,
}

impl RecordingHandle {
    /// Start a handle and the signal to give to `AudioCapture::capture`
    pub fn start(id: u64) -> (Self, StopSignal) {
        let (trigger, signal) = stop_pair();
        (
            Self {
                id,
                trigger,
                started_at: Instant::now(),
                stop_requested: false,
            },
            signal,
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the capture to finalize early. Idempotent.
    pub fn request_stop(&mut self) {
        if !self.stop_requested {
            self.stop_requested = true;
            self.trigger.fire();
        }
    }

    /// Whether the user ended this recording
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
