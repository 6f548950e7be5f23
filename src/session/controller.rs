use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::session::{Session, Turn};
use super::state::{SessionEvent, SessionState};
use crate::audio::{
    stop_pair, AudioCapture, AudioClip, AudioPlayer, PlaybackOutcome, RecordingHandle,
    SpeechAudio, StopSignal, StopTrigger,
};
use crate::error::{SessionError, VoiceError};
use crate::meal::{FinalizedMeal, MealSink};
use crate::providers::{Dialogue, SpeechSynthesizer, Transcriber, PREVIEW_TEXT};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Capabilities a controller sequences
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn AudioCapture>,
    pub transcriber: Arc<dyn Transcriber>,
    pub dialogue: Arc<dyn Dialogue>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub player: Arc<dyn AudioPlayer>,
    /// Receives the finalized meal of every completed session
    pub sink: Arc<dyn MealSink>,
}

/// One observed state transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub session_id: Uuid,
    pub from: SessionState,
    pub to: SessionState,
    pub event: SessionEvent,
    /// Turns collected when the transition happened
    pub turn_count: usize,
    /// Set for `Failed` and `SpeechFailed`
    pub error: Option<VoiceError>,
}

/// Drives one meal-logging session at a time:
/// record -> transcribe -> clarify -> speak -> record -> transcribe ->
/// finalize -> speak -> commit.
///
/// The current state is always readable with [`state`](Self::state) (or a
/// `watch` receiver from [`subscribe`](Self::subscribe)); every transition is
/// also broadcast as a [`StateChange`].
pub struct VoiceController {
    collaborators: Collaborators,
    state_tx: watch::Sender<SessionState>,
    changes: broadcast::Sender<StateChange>,
    recording: Mutex<Option<RecordingHandle>>,
    playback: Mutex<Option<(u64, StopTrigger)>>,
    voice: Mutex<Option<String>>,
    next_handle_id: AtomicU64,
}

impl VoiceController {
    pub fn new(collaborators: Collaborators) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (changes, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            collaborators,
            state_tx,
            changes,
            recording: Mutex::new(None),
            playback: Mutex::new(None),
            voice: Mutex::new(None),
            next_handle_id: AtomicU64::new(1),
        }
    }

    /// Current state, readable at any time
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Receiver that always holds the latest state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Stream of transitions from now on
    pub fn transitions(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub fn set_voice(&self, voice_id: Option<String>) {
        info!("Active voice set to {:?}", voice_id);
        *lock(&self.voice) = voice_id;
    }

    pub fn active_voice(&self) -> Option<String> {
        lock(&self.voice).clone()
    }

    /// Whether a recording handle is currently held
    pub fn has_active_recording(&self) -> bool {
        lock(&self.recording).is_some()
    }

    /// Whether speech (question, result or preview) is currently playing
    pub fn is_playing(&self) -> bool {
        lock(&self.playback).is_some()
    }

    /// Run a full session from `Idle` back to `Idle`.
    ///
    /// Rejected with `AlreadyInProgress`, without any transition, unless the
    /// controller is idle. The finalized meal is handed to the sink exactly
    /// once, and only when the session got through `SpeakingResult`.
    pub async fn start_session(&self) -> Result<FinalizedMeal, SessionError> {
        // The first recording is installed in the same step that leaves Idle,
        // so a stop that sees `Listening` always finds a handle.
        let mut first = None;
        self.state_tx.send_if_modified(|state| {
            if !state.is_idle() {
                return false;
            }
            first = Some(self.install_recording());
            *state = SessionState::Listening;
            true
        });
        let Some((slot, signal)) = first else {
            warn!("Start requested while {}, ignoring", self.state());
            return Err(SessionError::AlreadyInProgress);
        };

        let mut active = ActiveSession {
            controller: self,
            session: Session::new(),
            finished: false,
        };
        active.session.set_state(SessionState::Listening);
        info!("Session {} started", active.session.id());
        self.publish(
            &active.session,
            SessionState::Idle,
            SessionEvent::StartRequested,
            None,
        );

        let outcome = self.run(&mut active.session, slot, signal).await;
        active.finished = true;

        match outcome {
            Ok(meal) => Ok(meal),
            Err(err) => {
                self.abort(&mut active.session, err.clone());
                Err(SessionError::Aborted(err))
            }
        }
    }

    /// End the active recording early, keeping what was captured so far.
    ///
    /// Returns `false` (and does nothing) unless the controller is listening.
    pub fn stop_active_capture(&self) -> bool {
        let state = self.state();
        if !state.is_listening() {
            debug!("Stop requested while {}, ignoring", state);
            return false;
        }
        match lock(&self.recording).as_mut() {
            Some(handle) => {
                info!("Stopping recording {} after {:?}", handle.id(), handle.elapsed());
                handle.request_stop();
                true
            }
            None => false,
        }
    }

    /// Stop whatever speech is playing. Returns whether anything was playing.
    pub fn cancel_preview(&self) -> bool {
        match lock(&self.playback).take() {
            Some((id, mut trigger)) => {
                info!("Cancelling playback {}", id);
                trigger.fire();
                true
            }
            None => false,
        }
    }

    /// Speak the preview sentence with `voice_id` (or the active voice).
    ///
    /// Replaces any playing preview. Refused while a session is listening so
    /// playback never overlaps a recording.
    pub async fn play_preview(&self, voice_id: Option<&str>) -> PlaybackOutcome {
        if self.state().is_listening() {
            warn!("Preview requested while listening, ignoring");
            return PlaybackOutcome::Interrupted;
        }

        let voice = voice_id.map(str::to_string).or_else(|| self.active_voice());
        let audio = match self
            .collaborators
            .synthesizer
            .synthesize(PREVIEW_TEXT, voice.as_deref())
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Preview synthesis failed: {}", e);
                return PlaybackOutcome::Failed(e);
            }
        };

        self.play(audio).await
    }

    async fn run(
        &self,
        session: &mut Session,
        slot: RecordingSlot<'_>,
        signal: StopSignal,
    ) -> Result<FinalizedMeal, VoiceError> {
        let (clip, event) = self.record(&slot, signal).await?;
        self.transition(session, event, None)?;
        drop(slot);

        let utterance = self.transcribe(&clip).await?;
        session.push(Turn::user(utterance.clone()))?;
        self.transition(session, SessionEvent::TranscriptReceived, None)?;

        let question = self
            .collaborators
            .dialogue
            .ask_clarifying_question(&utterance)
            .await?;
        info!("Clarifying question: {}", question);
        session.push(Turn::assistant(question.clone()))?;
        self.transition(session, SessionEvent::QuestionReceived, None)?;

        let (event, speech_error) = self.speak(&question).await;
        let (slot, signal) = self.install_recording();
        self.transition(session, event, speech_error)?;

        let (clip, event) = self.record(&slot, signal).await?;
        self.transition(session, event, None)?;
        drop(slot);

        let answer = self.transcribe(&clip).await?;
        session.push(Turn::user(answer))?;
        self.transition(session, SessionEvent::TranscriptReceived, None)?;

        let meal = self.collaborators.dialogue.finalize(session.turns()).await?;
        session.set_result(meal.clone());
        self.transition(session, SessionEvent::ResultReceived, None)?;

        let (event, speech_error) = self.speak(&meal.voice_summary).await;
        self.transition(session, event, speech_error)?;

        let meal = session.take_result().unwrap_or(meal);
        info!(
            "Session {} complete after {}s: {} ({} kcal, satiety {:.2}, {})",
            session.id(),
            (Utc::now() - session.started_at()).num_seconds(),
            meal.summary,
            meal.calories,
            meal.satiety_score,
            meal.satiety_tier()
        );
        self.collaborators.sink.commit(meal.clone());
        Ok(meal)
    }

    /// Put a fresh handle in the recording slot, stopping any older one.
    ///
    /// Called before the state enters `Listening`/`ListeningAnswer`; the
    /// returned slot is dropped only after the state has left it again.
    fn install_recording(&self) -> (RecordingSlot<'_>, StopSignal) {
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        let (handle, signal) = RecordingHandle::start(id);
        if let Some(mut previous) = lock(&self.recording).replace(handle) {
            warn!("Replacing recording {} with {}", previous.id(), id);
            previous.request_stop();
        }
        (
            RecordingSlot {
                controller: self,
                id,
            },
            signal,
        )
    }

    /// One capture into an installed slot. Runs once the state is listening,
    /// so speech stopped here cannot be restarted by `play`.
    async fn record(
        &self,
        slot: &RecordingSlot<'_>,
        signal: StopSignal,
    ) -> Result<(AudioClip, SessionEvent), VoiceError> {
        self.cancel_preview();

        debug!(
            "Recording {} started on {}",
            slot.id,
            self.collaborators.capture.name()
        );
        let clip = self.collaborators.capture.capture(signal).await?;

        let stopped_early = slot.stop_requested();
        info!(
            "Recording {} finished: {} bytes{}",
            slot.id,
            clip.bytes.len(),
            if stopped_early { " (stopped by user)" } else { "" }
        );

        let event = if stopped_early {
            SessionEvent::StopRequested
        } else {
            SessionEvent::AudioCaptured
        };
        Ok((clip, event))
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        if clip.is_empty() {
            return Err(VoiceError::transcription("no audio captured"));
        }
        let text = self.collaborators.transcriber.transcribe(clip).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::transcription("empty transcript"));
        }
        info!("Transcript: {}", text);
        Ok(text.to_string())
    }

    /// Speech output never fails the session; failures map to `SpeechFailed`.
    async fn speak(&self, text: &str) -> (SessionEvent, Option<VoiceError>) {
        let voice = self.active_voice();
        let audio = match self
            .collaborators
            .synthesizer
            .synthesize(text, voice.as_deref())
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Speech synthesis failed, continuing: {}", e);
                return (SessionEvent::SpeechFailed, Some(e));
            }
        };

        match self.play(audio).await {
            PlaybackOutcome::Finished | PlaybackOutcome::Interrupted => {
                (SessionEvent::PlaybackFinished, None)
            }
            PlaybackOutcome::Failed(e) => {
                warn!("Playback failed, continuing: {}", e);
                (SessionEvent::SpeechFailed, Some(e))
            }
        }
    }

    async fn play(&self, audio: SpeechAudio) -> PlaybackOutcome {
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        let (trigger, signal) = stop_pair();
        {
            let mut slot = lock(&self.playback);
            // checked under the lock: recording flips the state before it cancels
            if self.state().is_listening() {
                debug!("Playback {} refused while listening", id);
                return PlaybackOutcome::Interrupted;
            }
            if let Some((previous, mut old)) = slot.replace((id, trigger)) {
                debug!("Playback {} replaces {}", id, previous);
                old.fire();
            }
        }

        let outcome = self.collaborators.player.play(audio, signal).await;

        let mut slot = lock(&self.playback);
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            slot.take();
        }
        outcome
    }

    fn transition(
        &self,
        session: &mut Session,
        event: SessionEvent,
        error: Option<VoiceError>,
    ) -> Result<SessionState, VoiceError> {
        let from = session.state();
        let to = from
            .next(event)
            .ok_or(VoiceError::InvalidTransition { from, event })?;

        session.set_state(to);
        self.state_tx.send_replace(to);
        self.publish(session, from, event, error);
        Ok(to)
    }

    fn abort(&self, session: &mut Session, err: VoiceError) {
        error!(
            "Session {} aborted in {}: {} ({} turns discarded)",
            session.id(),
            session.state(),
            err,
            session.turns().len()
        );

        if let Some(mut handle) = lock(&self.recording).take() {
            handle.request_stop();
        }

        if self
            .transition(session, SessionEvent::Failed, Some(err))
            .is_err()
        {
            session.set_state(SessionState::Idle);
            self.state_tx.send_replace(SessionState::Idle);
        }
    }

    fn publish(
        &self,
        session: &Session,
        from: SessionState,
        event: SessionEvent,
        error: Option<VoiceError>,
    ) {
        let to = session.state();
        info!("State {} -> {} on {:?}", from, to, event);
        // no receivers is fine
        let _ = self.changes.send(StateChange {
            session_id: session.id(),
            from,
            to,
            event,
            turn_count: session.turns().len(),
            error,
        });
    }
}

/// The running session. If `start_session` is dropped mid-flight this
/// releases the recording and playback and publishes a `Cancelled` return
/// to `Idle`.
struct ActiveSession<'a> {
    controller: &'a VoiceController,
    session: Session,
    finished: bool,
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let from = self.session.state();
        warn!(
            "Session {} dropped in {}, returning to idle",
            self.session.id(),
            from
        );
        if let Some(mut handle) = lock(&self.controller.recording).take() {
            handle.request_stop();
        }
        self.controller.cancel_preview();

        self.session.set_state(SessionState::Idle);
        self.controller.state_tx.send_replace(SessionState::Idle);
        self.controller
            .publish(&self.session, from, SessionEvent::Cancelled, None);
    }
}

/// Owns the slot entry for one recording id.
struct RecordingSlot<'a> {
    controller: &'a VoiceController,
    id: u64,
}

impl RecordingSlot<'_> {
    fn stop_requested(&self) -> bool {
        lock(&self.controller.recording)
            .as_ref()
            .is_some_and(|h| h.id() == self.id && h.stop_requested())
    }

    fn take(&self) -> Option<RecordingHandle> {
        let mut slot = lock(&self.controller.recording);
        if slot.as_ref().is_some_and(|h| h.id() == self.id) {
            slot.take()
        } else {
            None
        }
    }
}

impl Drop for RecordingSlot<'_> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.take() {
            handle.request_stop();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
