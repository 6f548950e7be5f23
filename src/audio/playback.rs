use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::signal::StopSignal;
use crate::error::VoiceError;

/// Synthesized speech ready to be played
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SpeechAudio {
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/mpeg".to_string(),
        }
    }
}

/// How a playback ended. This is the single completion signal of a playback.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    /// Played to the end
    Finished,
    /// Cut short by a stop signal (barge-in, new preview)
    Interrupted,
    /// Could not be played
    Failed(VoiceError),
}

/// Audio output device
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play `audio`, resolving when it ends, fails, or `stop` fires.
    /// Playback must be silent by the time an `Interrupted` outcome is returned.
    async fn play(&self, audio: SpeechAudio, stop: StopSignal) -> PlaybackOutcome;
}

/// Player that drops the audio, for headless runs
#[derive(Debug, Default)]
pub struct DiscardPlayer;

#[async_trait::async_trait]
impl AudioPlayer for DiscardPlayer {
    async fn play(&self, audio: SpeechAudio, _stop: StopSignal) -> PlaybackOutcome {
        debug!("Discarding {} bytes of {}", audio.bytes.len(), audio.mime_type);
        PlaybackOutcome::Finished
    }
}

/// Player that writes each utterance to a numbered file in `dir`
pub struct FilePlayer {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl FilePlayer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicUsize::new(0),
        }
    }

    fn extension(mime_type: &str) -> &'static str {
        match mime_type {
            "audio/wav" => "wav",
            "audio/ogg" => "ogg",
            _ => "mp3",
        }
    }
}

#[async_trait::async_trait]
impl AudioPlayer for FilePlayer {
    async fn play(&self, audio: SpeechAudio, mut stop: StopSignal) -> PlaybackOutcome {
        if stop.is_stopped() {
            return PlaybackOutcome::Interrupted;
        }

        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!(
            "speech-{:03}.{}",
            index,
            Self::extension(&audio.mime_type)
        ));

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            return PlaybackOutcome::Failed(VoiceError::speech(format!(
                "failed to create {}: {}",
                self.dir.display(),
                e
            )));
        }

        match tokio::fs::write(&path, &audio.bytes).await {
            Ok(()) => {
                info!("Wrote speech to {}", path.display());
                PlaybackOutcome::Finished
            }
            Err(e) => PlaybackOutcome::Failed(VoiceError::speech(format!(
                "failed to write {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
