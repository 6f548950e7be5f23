// Test doubles for the controller's collaborators.
//
// Each fake records what it was asked to do so tests can assert on call
// order, and the capture fake tracks how many streams are open at once.

#![allow(dead_code)]

use satiety::audio::{
    AudioCapture, AudioClip, AudioPlayer, PlaybackOutcome, SpeechAudio, StopSignal,
};
use satiety::error::VoiceError;
use satiety::meal::{FinalizedMeal, Insight, InsightKind, MealLog};
use satiety::providers::{Dialogue, SpeechSynthesizer, Transcriber, PREVIEW_TEXT};
use satiety::session::{Collaborators, Turn, VoiceController};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn sample_meal() -> FinalizedMeal {
    FinalizedMeal {
        summary: "Chicken salad".to_string(),
        calories: 420,
        protein_g: 38.0,
        carbs_g: 12.0,
        fat_g: 22.0,
        sugar_g: 4.0,
        fiber_g: 6.0,
        satiety_score: 0.74,
        voice_summary: "A solid chicken salad. That should hold you for three to four hours."
            .to_string(),
        insights: vec![
            Insight {
                kind: InsightKind::Good,
                text: "Plenty of lean protein.".to_string(),
            },
            Insight {
                kind: InsightKind::Tip,
                text: "Add chickpeas for more fiber.".to_string(),
            },
        ],
    }
}

// ============================================================================
// Capture
// ============================================================================

/// What the next `capture` call does
#[derive(Debug, Clone)]
pub enum CaptureStep {
    /// Resolve immediately with these bytes
    Audio(&'static str),
    /// Block until stopped, then resolve with these bytes
    UntilStopped(&'static str),
    Denied,
    Fail,
}

#[derive(Default)]
pub struct ScriptedCapture {
    steps: Mutex<VecDeque<CaptureStep>>,
    pub calls: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
}

impl ScriptedCapture {
    pub fn new(steps: impl IntoIterator<Item = CaptureStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

struct OpenStream<'a>(&'a ScriptedCapture);

impl Drop for OpenStream<'_> {
    fn drop(&mut self) {
        self.0.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn capture(&self, mut stop: StopSignal) -> Result<AudioClip, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CaptureStep::Fail);

        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);
        let _stream = OpenStream(self);

        match step {
            CaptureStep::Audio(bytes) => Ok(AudioClip::new(bytes.as_bytes().to_vec(), "audio/webm")),
            CaptureStep::UntilStopped(bytes) => {
                stop.stopped().await;
                Ok(AudioClip::new(bytes.as_bytes().to_vec(), "audio/webm"))
            }
            CaptureStep::Denied => Err(VoiceError::MicrophoneDenied),
            CaptureStep::Fail => Err(VoiceError::capture("device unplugged")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Transcriber
// ============================================================================

/// Transcribes a clip by echoing its bytes as text, or fails on a given call
#[derive(Default)]
pub struct EchoTranscriber {
    pub fail_on_call: Option<usize>,
    pub calls: AtomicUsize,
}

impl EchoTranscriber {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(VoiceError::transcription("502 from vendor"));
        }
        Ok(String::from_utf8_lossy(&clip.bytes).into_owned())
    }
}

// ============================================================================
// Dialogue
// ============================================================================

pub struct ScriptedDialogue {
    pub question: Result<String, VoiceError>,
    pub result: Result<FinalizedMeal, VoiceError>,
    pub utterances: Mutex<Vec<String>>,
    pub finalized_turns: Mutex<Vec<Turn>>,
}

impl ScriptedDialogue {
    pub fn new(question: &str) -> Self {
        Self {
            question: Ok(question.to_string()),
            result: Ok(sample_meal()),
            utterances: Mutex::new(Vec::new()),
            finalized_turns: Mutex::new(Vec::new()),
        }
    }

    pub fn question_fails(mut self) -> Self {
        self.question = Err(VoiceError::dialogue("model unavailable"));
        self
    }

    pub fn finalize_fails_with(mut self, err: VoiceError) -> Self {
        self.result = Err(err);
        self
    }
}

#[async_trait::async_trait]
impl Dialogue for ScriptedDialogue {
    async fn ask_clarifying_question(&self, utterance: &str) -> Result<String, VoiceError> {
        self.utterances.lock().unwrap().push(utterance.to_string());
        self.question.clone()
    }

    async fn finalize(&self, turns: &[Turn]) -> Result<FinalizedMeal, VoiceError> {
        self.finalized_turns.lock().unwrap().extend_from_slice(turns);
        self.result.clone()
    }
}

// ============================================================================
// Speech output
// ============================================================================

#[derive(Default)]
pub struct FakeSynthesizer {
    /// Fail every request whose text contains this
    pub fail_when_contains: Option<&'static str>,
    pub requests: Mutex<Vec<(String, Option<String>)>>,
    /// Hold the preview request until this is notified
    pub preview_gate: Option<Arc<Notify>>,
}

impl FakeSynthesizer {
    pub fn failing_on(fragment: &'static str) -> Self {
        Self {
            fail_when_contains: Some(fragment),
            ..Default::default()
        }
    }

    pub fn gating_preview(gate: Arc<Notify>) -> Self {
        Self {
            preview_gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<SpeechAudio, VoiceError> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.map(str::to_string)));
        if let Some(gate) = self.preview_gate.as_ref().filter(|_| text == PREVIEW_TEXT) {
            gate.notified().await;
        }
        match self.fail_when_contains {
            Some(fragment) if text.contains(fragment) => {
                Err(VoiceError::speech("autoplay blocked"))
            }
            _ => Ok(SpeechAudio::mpeg(text.as_bytes().to_vec())),
        }
    }
}

/// Player that either finishes at once or holds until stopped
#[derive(Default)]
pub struct FakePlayer {
    pub hold_until_stopped: bool,
    pub fail: bool,
    pub plays: AtomicUsize,
    pub interrupted: AtomicUsize,
}

impl FakePlayer {
    pub fn holding() -> Self {
        Self {
            hold_until_stopped: true,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl AudioPlayer for FakePlayer {
    async fn play(&self, _audio: SpeechAudio, mut stop: StopSignal) -> PlaybackOutcome {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return PlaybackOutcome::Failed(VoiceError::speech("output device busy"));
        }
        if self.hold_until_stopped {
            stop.stopped().await;
            self.interrupted.fetch_add(1, Ordering::SeqCst);
            return PlaybackOutcome::Interrupted;
        }
        PlaybackOutcome::Finished
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: Arc<VoiceController>,
    pub capture: Arc<ScriptedCapture>,
    pub transcriber: Arc<EchoTranscriber>,
    pub dialogue: Arc<ScriptedDialogue>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub player: Arc<FakePlayer>,
    pub meals: Arc<MealLog>,
}

impl Harness {
    pub fn new(
        capture: ScriptedCapture,
        transcriber: EchoTranscriber,
        dialogue: ScriptedDialogue,
        synthesizer: FakeSynthesizer,
        player: FakePlayer,
    ) -> Self {
        let capture = Arc::new(capture);
        let transcriber = Arc::new(transcriber);
        let dialogue = Arc::new(dialogue);
        let synthesizer = Arc::new(synthesizer);
        let player = Arc::new(player);
        let meals = Arc::new(MealLog::new());

        let controller = Arc::new(VoiceController::new(Collaborators {
            capture: capture.clone(),
            transcriber: transcriber.clone(),
            dialogue: dialogue.clone(),
            synthesizer: synthesizer.clone(),
            player: player.clone(),
            sink: meals.clone(),
        }));

        Self {
            controller,
            capture,
            transcriber,
            dialogue,
            synthesizer,
            player,
            meals,
        }
    }

    /// Both recordings resolve on their own, everything succeeds
    pub fn happy() -> Self {
        Self::new(
            ScriptedCapture::new([
                CaptureStep::Audio("I had a chicken salad"),
                CaptureStep::Audio("just greens and chicken, light dressing"),
            ]),
            EchoTranscriber::default(),
            ScriptedDialogue::new("What kind of dressing, and roughly how big was the bowl?"),
            FakeSynthesizer::default(),
            FakePlayer::default(),
        )
    }
}
