// Integration tests for the voice interaction controller
//
// These tests drive full sessions against scripted collaborators and check
// the observable transitions, commits and resource release on every path.

mod common;

use anyhow::Result;
use common::{
    CaptureStep, EchoTranscriber, FakePlayer, FakeSynthesizer, Harness, ScriptedCapture,
    ScriptedDialogue,
};
use std::sync::Arc;
use tokio::sync::Notify;
use satiety::audio::PlaybackOutcome;
use satiety::error::{SessionError, VoiceError, GENERIC_RETRY_MESSAGE, MICROPHONE_DENIED_MESSAGE};
use satiety::session::{SessionEvent, SessionState, Speaker, StateChange, VoiceController};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(2);

fn drain(rx: &mut broadcast::Receiver<StateChange>) -> Vec<StateChange> {
    let mut changes = Vec::new();
    while let Ok(change) = rx.try_recv() {
        changes.push(change);
    }
    changes
}

async fn wait_for_state(controller: &VoiceController, state: SessionState) -> Result<()> {
    let mut rx = controller.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state)).await??;
    Ok(())
}

async fn wait_until(cond: impl Fn() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await?;
    Ok(())
}

fn assert_released(h: &Harness) {
    assert_eq!(h.controller.state(), SessionState::Idle);
    assert!(!h.controller.has_active_recording(), "recording handle leaked");
    assert_eq!(h.capture.open_streams(), 0, "capture stream left open");
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_full_session_visits_nine_states_and_commits_once() -> Result<()> {
    let h = Harness::happy();
    let mut rx = h.controller.transitions();

    let meal = h.controller.start_session().await?;

    let states: Vec<SessionState> = drain(&mut rx).iter().map(|c| c.to).collect();
    assert_eq!(
        states,
        vec![
            SessionState::Listening,
            SessionState::TranscribingFirst,
            SessionState::AwaitingQuestion,
            SessionState::SpeakingQuestion,
            SessionState::ListeningAnswer,
            SessionState::TranscribingAnswer,
            SessionState::Finalizing,
            SessionState::SpeakingResult,
            SessionState::Idle,
        ]
    );

    assert_eq!(meal.summary, "Chicken salad");
    assert_eq!(h.meals.len(), 1);
    assert_eq!(h.meals.meals()[0].meal, meal);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_finalize_receives_user_assistant_user_turns() -> Result<()> {
    let h = Harness::happy();
    h.controller.start_session().await?;

    let turns = h.dialogue.finalized_turns.lock().unwrap().clone();
    let speakers: Vec<Speaker> = turns.iter().map(|t| t.speaker()).collect();
    assert_eq!(speakers, vec![Speaker::User, Speaker::Assistant, Speaker::User]);
    assert_eq!(turns[0].text(), "I had a chicken salad");
    assert_eq!(
        turns[1].text(),
        "What kind of dressing, and roughly how big was the bowl?"
    );
    assert_eq!(turns[2].text(), "just greens and chicken, light dressing");

    assert_eq!(
        *h.dialogue.utterances.lock().unwrap(),
        vec!["I had a chicken salad".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_speaks_question_then_summary_with_active_voice() -> Result<()> {
    let h = Harness::happy();
    h.controller.set_voice(Some("rachel".to_string()));

    let meal = h.controller.start_session().await?;

    let requests = h.synthesizer.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].0.contains("dressing"));
    assert_eq!(requests[1].0, meal.voice_summary);
    assert!(requests
        .iter()
        .all(|(_, voice)| voice.as_deref() == Some("rachel")));
    assert_eq!(h.player.plays.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_late_observer_sees_current_state() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::UntilStopped("I had soup"), CaptureStep::Audio("tomato")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Creamy or clear?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    assert_eq!(h.controller.state(), SessionState::Idle);

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;

    let late = h.controller.subscribe();
    assert_eq!(*late.borrow(), SessionState::Listening);
    assert_eq!(h.controller.state(), SessionState::Listening);

    assert!(h.controller.stop_active_capture());
    session.await??;
    assert_released(&h);
    Ok(())
}

// ============================================================================
// Single session slot
// ============================================================================

#[tokio::test]
async fn test_start_while_active_is_rejected_without_transition() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::UntilStopped("I had a burrito"),
            CaptureStep::Audio("chicken, no sour cream"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Chicken or steak?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;

    let mut rx = h.controller.transitions();
    for _ in 0..3 {
        let err = h.controller.start_session().await.unwrap_err();
        assert_eq!(err, SessionError::AlreadyInProgress);
        assert_eq!(err.user_message(), "Already listening");
    }
    assert!(drain(&mut rx).is_empty());
    assert_eq!(h.controller.state(), SessionState::Listening);
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);

    h.controller.stop_active_capture();
    session.await??;

    assert_eq!(h.meals.len(), 1);
    assert_eq!(h.capture.max_open.load(Ordering::SeqCst), 1);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_new_session_can_start_after_previous_ends() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::Audio("eggs"),
            CaptureStep::Audio("two, scrambled"),
            CaptureStep::Audio("a banana"),
            CaptureStep::Audio("medium"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("How many?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );

    h.controller.start_session().await?;
    h.controller.start_session().await?;

    assert_eq!(h.meals.len(), 2);
    assert_released(&h);
    Ok(())
}

// ============================================================================
// Early stop
// ============================================================================

#[tokio::test]
async fn test_stop_during_listening_moves_to_transcribing_first() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::UntilStopped("I had a bagel"),
            CaptureStep::Audio("cream cheese"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Plain or with a spread?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;

    assert!(h.controller.stop_active_capture());
    wait_until(|| h.controller.state() != SessionState::Listening).await?;
    assert_eq!(h.capture.open_streams(), 0);

    session.await??;

    let changes = drain(&mut rx);
    assert_eq!(changes[1].from, SessionState::Listening);
    assert_eq!(changes[1].to, SessionState::TranscribingFirst);
    assert_eq!(changes[1].event, SessionEvent::StopRequested);
    assert_eq!(
        h.dialogue.utterances.lock().unwrap()[0],
        "I had a bagel",
        "audio captured so far is transcribed"
    );
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_stop_during_listening_answer_moves_to_transcribing_answer() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::Audio("I had ramen"),
            CaptureStep::UntilStopped("tonkotsu, extra egg"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Which broth?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_for_state(&h.controller, SessionState::ListeningAnswer).await?;
    wait_until(|| h.capture.open_streams() == 1).await?;

    assert!(h.controller.stop_active_capture());
    session.await??;

    let stop = drain(&mut rx)
        .into_iter()
        .find(|c| c.event == SessionEvent::StopRequested)
        .expect("stop transition");
    assert_eq!(stop.from, SessionState::ListeningAnswer);
    assert_eq!(stop.to, SessionState::TranscribingAnswer);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_stop_outside_listening_is_a_no_op() -> Result<()> {
    let h = Harness::happy();
    let mut rx = h.controller.transitions();

    assert!(!h.controller.stop_active_capture());
    assert!(drain(&mut rx).is_empty());

    h.controller.start_session().await?;
    assert!(!h.controller.stop_active_capture());
    Ok(())
}

// ============================================================================
// Failure policy
// ============================================================================

async fn assert_aborts_in(h: Harness, failing_state: SessionState) -> Result<VoiceError> {
    let mut rx = h.controller.transitions();

    let err = match h.controller.start_session().await {
        Err(SessionError::Aborted(err)) => err,
        other => panic!("expected abort, got {other:?}"),
    };

    let changes = drain(&mut rx);
    let last = changes.last().expect("transitions");
    assert_eq!(last.from, failing_state);
    assert_eq!(last.to, SessionState::Idle);
    assert_eq!(last.event, SessionEvent::Failed);
    assert_eq!(last.error.as_ref(), Some(&err));
    assert!(!changes.iter().any(|c| c.from == SessionState::SpeakingResult));

    assert!(h.meals.is_empty(), "failed session must not commit");
    assert_released(&h);
    Ok(err)
}

#[tokio::test]
async fn test_transcription_failure_on_first_utterance_aborts() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("I had toast")]),
        EchoTranscriber::failing_on(1),
        ScriptedDialogue::new("Butter?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let err = assert_aborts_in(h, SessionState::TranscribingFirst).await?;
    assert!(matches!(err, VoiceError::Transcription(_)));
    assert_eq!(err.user_message(), GENERIC_RETRY_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_empty_transcript_is_a_transcription_failure() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("   ")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Butter?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let dialogue = h.dialogue.clone();
    let err = assert_aborts_in(h, SessionState::TranscribingFirst).await?;
    assert!(matches!(err, VoiceError::Transcription(_)));
    assert!(dialogue.utterances.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_question_failure_aborts() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("I had pho")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("unused").question_fails(),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let synthesizer = h.synthesizer.clone();
    let err = assert_aborts_in(h, SessionState::AwaitingQuestion).await?;
    assert!(matches!(err, VoiceError::Dialogue(_)));
    assert!(synthesizer.texts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_transcription_failure_on_answer_aborts() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("I had curry"), CaptureStep::Audio("mild")]),
        EchoTranscriber::failing_on(2),
        ScriptedDialogue::new("How spicy?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let dialogue = h.dialogue.clone();
    assert_aborts_in(h, SessionState::TranscribingAnswer).await?;
    assert!(dialogue.finalized_turns.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_finalize_failure_aborts() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("I had sushi"), CaptureStep::Audio("8 pieces")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("How many pieces?")
            .finalize_fails_with(VoiceError::dialogue("503 UNAVAILABLE")),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let err = assert_aborts_in(h, SessionState::Finalizing).await?;
    assert!(matches!(err, VoiceError::Dialogue(_)));
    Ok(())
}

#[tokio::test]
async fn test_malformed_finalize_discards_all_three_turns() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::Audio("I had a chicken salad"),
            CaptureStep::Audio("just greens and chicken, light dressing"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("What dressing?")
            .finalize_fails_with(VoiceError::malformed("expected value at line 1")),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();
    let synthesizer = h.synthesizer.clone();
    let meals = h.meals.clone();

    let err = h.controller.start_session().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Aborted(VoiceError::MalformedResponse(_))
    ));
    assert_eq!(err.user_message(), GENERIC_RETRY_MESSAGE);

    let failed = drain(&mut rx).pop().expect("failure transition");
    assert_eq!(failed.from, SessionState::Finalizing);
    assert_eq!(failed.to, SessionState::Idle);
    assert_eq!(failed.turn_count, 3);

    assert!(meals.is_empty());
    assert_eq!(synthesizer.texts().len(), 1, "only the question was spoken");
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_microphone_denied_goes_straight_to_idle() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Denied]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("unused"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();

    let err = h.controller.start_session().await.unwrap_err();
    assert_eq!(err, SessionError::Aborted(VoiceError::MicrophoneDenied));
    assert_eq!(err.user_message(), MICROPHONE_DENIED_MESSAGE);
    assert_ne!(err.user_message(), GENERIC_RETRY_MESSAGE);

    let path: Vec<(SessionState, SessionState)> =
        drain(&mut rx).iter().map(|c| (c.from, c.to)).collect();
    assert_eq!(
        path,
        vec![
            (SessionState::Idle, SessionState::Listening),
            (SessionState::Listening, SessionState::Idle),
        ]
    );
    assert_eq!(h.transcriber.calls.load(Ordering::SeqCst), 0);
    assert!(h.meals.is_empty());
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_capture_failure_aborts_from_listening() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Fail]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("unused"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );
    let err = assert_aborts_in(h, SessionState::Listening).await?;
    assert!(matches!(err, VoiceError::Capture(_)));
    Ok(())
}

// ============================================================================
// Speech output is never fatal
// ============================================================================

#[tokio::test]
async fn test_question_speech_failure_still_commits() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::Audio("I had a chicken salad"),
            CaptureStep::Audio("light dressing"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("What kind of dressing?"),
        FakeSynthesizer::failing_on("dressing?"),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();

    h.controller.start_session().await?;

    let speech = drain(&mut rx)
        .into_iter()
        .find(|c| c.from == SessionState::SpeakingQuestion)
        .expect("speaking question transition");
    assert_eq!(speech.event, SessionEvent::SpeechFailed);
    assert_eq!(speech.to, SessionState::ListeningAnswer);
    assert!(matches!(speech.error, Some(VoiceError::SpeechOutput(_))));

    assert_eq!(h.meals.len(), 1);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_result_speech_failure_still_commits() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::Audio("I had a chicken salad"),
            CaptureStep::Audio("light dressing"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("What kind of dressing?"),
        FakeSynthesizer::failing_on("solid chicken salad"),
        FakePlayer::default(),
    );
    let mut rx = h.controller.transitions();

    let meal = h.controller.start_session().await?;

    let last = drain(&mut rx).pop().expect("transitions");
    assert_eq!(last.from, SessionState::SpeakingResult);
    assert_eq!(last.to, SessionState::Idle);
    assert_eq!(last.event, SessionEvent::SpeechFailed);

    assert_eq!(h.meals.len(), 1);
    assert_eq!(h.meals.meals()[0].meal, meal);
    Ok(())
}

#[tokio::test]
async fn test_playback_failures_still_commit() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::Audio("oatmeal"), CaptureStep::Audio("with berries")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Any toppings?"),
        FakeSynthesizer::default(),
        FakePlayer::failing(),
    );

    h.controller.start_session().await?;

    assert_eq!(h.player.plays.load(Ordering::SeqCst), 2);
    assert_eq!(h.meals.len(), 1);
    assert_released(&h);
    Ok(())
}

// ============================================================================
// Barge-in and preview
// ============================================================================

#[tokio::test]
async fn test_recording_interrupts_preview_and_question_playback() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([
            CaptureStep::UntilStopped("I had a chicken salad"),
            CaptureStep::Audio("light dressing"),
        ]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("What dressing?"),
        FakeSynthesizer::default(),
        FakePlayer::holding(),
    );

    let controller = h.controller.clone();
    let preview = tokio::spawn(async move { controller.play_preview(Some("adam")).await });
    wait_until(|| h.controller.is_playing()).await?;

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;

    assert_eq!(preview.await?, PlaybackOutcome::Interrupted);
    assert!(!h.controller.is_playing(), "playback overlaps capture");

    h.controller.stop_active_capture();

    // the question holds until cut short
    wait_for_state(&h.controller, SessionState::SpeakingQuestion).await?;
    wait_until(|| h.controller.is_playing()).await?;
    assert!(h.controller.cancel_preview());

    wait_for_state(&h.controller, SessionState::SpeakingResult).await?;
    wait_until(|| h.controller.is_playing()).await?;
    assert!(h.controller.cancel_preview());

    session.await??;
    assert_eq!(h.player.interrupted.load(Ordering::SeqCst), 3);
    assert_eq!(h.meals.len(), 1);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_preview_uses_requested_voice_and_is_refused_while_listening() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::UntilStopped("I had soup"), CaptureStep::Audio("lentil")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("What kind?"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );

    assert_eq!(
        h.controller.play_preview(Some("bella")).await,
        PlaybackOutcome::Finished
    );
    assert_eq!(
        h.synthesizer.requests.lock().unwrap()[0].1.as_deref(),
        Some("bella")
    );

    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;

    assert_eq!(
        h.controller.play_preview(None).await,
        PlaybackOutcome::Interrupted
    );
    assert_eq!(h.synthesizer.texts().len(), 1);

    h.controller.stop_active_capture();
    session.await??;
    Ok(())
}

#[tokio::test]
async fn test_preview_synthesized_before_recording_never_plays_over_it() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::UntilStopped("I had ramen"), CaptureStep::Audio("pork")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("Which broth?"),
        FakeSynthesizer::gating_preview(gate.clone()),
        FakePlayer::default(),
    );

    let controller = h.controller.clone();
    let preview = tokio::spawn(async move { controller.play_preview(None).await });
    wait_until(|| h.synthesizer.texts().len() == 1).await?;

    // recording starts while the preview audio is still being fetched
    let controller = h.controller.clone();
    let session = tokio::spawn(async move { controller.start_session().await });
    wait_until(|| h.capture.open_streams() == 1).await?;
    gate.notify_one();

    assert_eq!(preview.await?, PlaybackOutcome::Interrupted);
    assert_eq!(h.player.plays.load(Ordering::SeqCst), 0);
    assert!(!h.controller.is_playing());

    h.controller.stop_active_capture();
    session.await??;
    assert_eq!(h.meals.len(), 1);
    assert_released(&h);
    Ok(())
}

#[tokio::test]
async fn test_cancel_preview_with_nothing_playing() {
    let h = Harness::happy();
    assert!(!h.controller.cancel_preview());
}

// ============================================================================
// Isolation and teardown
// ============================================================================

#[tokio::test]
async fn test_controllers_do_not_share_state() -> Result<()> {
    let a = Harness::happy();
    let b = Harness::happy();
    a.controller.set_voice(Some("rachel".to_string()));

    let (ra, rb) = tokio::join!(a.controller.start_session(), b.controller.start_session());
    ra?;
    rb?;

    assert_eq!(a.meals.len(), 1);
    assert_eq!(b.meals.len(), 1);
    assert_eq!(b.controller.active_voice(), None);
    assert!(b
        .synthesizer
        .requests
        .lock()
        .unwrap()
        .iter()
        .all(|(_, voice)| voice.is_none()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_a_session_releases_capture_and_slot() -> Result<()> {
    let h = Harness::new(
        ScriptedCapture::new([CaptureStep::UntilStopped("never stopped")]),
        EchoTranscriber::default(),
        ScriptedDialogue::new("unused"),
        FakeSynthesizer::default(),
        FakePlayer::default(),
    );

    let mut rx = h.controller.transitions();
    let result =
        tokio::time::timeout(Duration::from_secs(30), h.controller.start_session()).await;
    assert!(result.is_err(), "session should still be listening");

    assert_released(&h);
    assert!(h.meals.is_empty());

    let last = drain(&mut rx).pop().expect("teardown transition");
    assert_eq!(last.event, SessionEvent::Cancelled);
    assert_eq!(last.from, SessionState::Listening);
    assert_eq!(last.to, SessionState::Idle);

    // slot is free again
    let err = h.controller.start_session().await.unwrap_err();
    assert!(matches!(err, SessionError::Aborted(VoiceError::Capture(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listening_state_always_has_a_recording_to_stop() -> Result<()> {
    for _ in 0..20 {
        let h = Harness::new(
            ScriptedCapture::new([
                CaptureStep::UntilStopped("I had a burrito"),
                CaptureStep::UntilStopped("no sour cream"),
            ]),
            EchoTranscriber::default(),
            ScriptedDialogue::new("Any toppings?"),
            FakeSynthesizer::default(),
            FakePlayer::default(),
        );

        // observe from a plain thread so reads interleave with the session task
        let controller = h.controller.clone();
        let mut rx = controller.subscribe();
        let observer = std::thread::spawn(move || {
            let deadline = Instant::now() + WAIT;
            let mut stopped_in = Vec::new();
            while stopped_in.len() < 2 && Instant::now() < deadline {
                let state = *rx.borrow_and_update();
                if state.is_listening() && !stopped_in.contains(&state) {
                    let stopped = controller.stop_active_capture();
                    if !rx.has_changed().unwrap_or(true) {
                        assert!(stopped, "no recording to stop while {state}");
                    }
                    if stopped {
                        stopped_in.push(state);
                    }
                }
                std::thread::yield_now();
            }
            stopped_in
        });

        let controller = h.controller.clone();
        let session = tokio::spawn(async move { controller.start_session().await });

        let stopped_in = tokio::task::spawn_blocking(move || observer.join())
            .await?
            .expect("observer thread panicked");
        assert_eq!(
            stopped_in,
            vec![SessionState::Listening, SessionState::ListeningAnswer]
        );

        tokio::time::timeout(WAIT, session).await???;
        assert_eq!(h.meals.len(), 1);
        assert_released(&h);
    }
    Ok(())
}
