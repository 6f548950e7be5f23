use super::state::AppState;
use crate::audio::AudioClip;
use crate::error::VoiceError;
use crate::meal::{parse_finalize_reply, FinalizedMeal};
use crate::providers::{resolve_voice_id, ChatMessage, ChatPhase, VoiceOption, PREVIEW_TEXT};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Request text that stands for the voice preview sentence
pub const PREVIEW_SENTINEL: &str = "__PREVIEW__";

const DEFAULT_UPLOAD_MIME: &str = "audio/webm";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SttResponse {
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: Option<String>,

    /// Voice to use; missing, empty, `"null"` and `"undefined"` mean default
    #[serde(rename = "voiceId")]
    pub voice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub phase: Option<ChatPhase>,
    pub messages: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Clarifying question, or the spoken summary of a finalized meal
    pub reply: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FinalizedMeal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn error_response(status: StatusCode, error: &str, detail: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            detail,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /api/stt
/// Transcribe the multipart `audio` part
pub async fn speech_to_text(State(state): State<AppState>, multipart: Multipart) -> Response {
    let clip = match read_audio_part(multipart).await {
        Ok(Some(clip)) => clip,
        Ok(None) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "STT failed",
                Some("No audio file provided".to_string()),
            )
        }
        Err(detail) => return error_response(StatusCode::BAD_REQUEST, "STT failed", Some(detail)),
    };

    info!("[STT] {} bytes of {}", clip.bytes.len(), clip.mime_type);

    match state.transcriber.transcribe(&clip).await {
        Ok(transcript) => Json(SttResponse { transcript }).into_response(),
        Err(e) => {
            error!("[STT] Failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STT failed",
                Some(e.to_string()),
            )
        }
    }
}

async fn read_audio_part(mut multipart: Multipart) -> Result<Option<AudioClip>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() != Some("audio") {
            continue;
        }
        let mime_type = field
            .content_type()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_MIME)
            .to_string();
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok(Some(AudioClip::new(bytes.to_vec(), mime_type)));
    }
    Ok(None)
}

/// POST /api/tts
/// Synthesize speech, returning `audio/mpeg` bytes
pub async fn text_to_speech(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Response {
    let text = match req.text.as_deref() {
        Some(PREVIEW_SENTINEL) => PREVIEW_TEXT,
        Some(text) => text,
        None => "",
    };

    let Some(voice_id) = resolve_voice_id(req.voice_id.as_deref(), state.default_voice_id.as_deref())
    else {
        error!("[TTS] No voice ID available");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No voice ID configured",
            None,
        );
    };

    if text.trim().is_empty() {
        warn!("[TTS] Empty text received");
        return error_response(StatusCode::BAD_REQUEST, "Empty text", None);
    }

    match state.synthesizer.synthesize(text, Some(&voice_id)).await {
        Ok(audio) => ([(header::CONTENT_TYPE, audio.mime_type)], audio.bytes).into_response(),
        Err(e) => {
            error!("[TTS] Failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TTS failed",
                Some(e.to_string()),
            )
        }
    }
}

/// POST /api/chat
/// Run one clarify or finalize step against the chat model
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let (phase, messages) = match (req.phase, req.messages) {
        (Some(phase), Some(messages)) if !messages.is_empty() => (phase, messages),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Chat failed",
                Some("Missing messages or phase".to_string()),
            )
        }
    };

    info!("[chat] {:?} with {} messages", phase, messages.len());

    let raw = match state.chat.complete(phase, &messages).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("[chat] Failed: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Chat failed",
                Some(e.to_string()),
            );
        }
    };

    match phase {
        ChatPhase::Clarify => Json(ChatResponse {
            reply: raw,
            data: None,
        })
        .into_response(),
        ChatPhase::Finalize => match parse_finalize_reply(&raw) {
            Ok(meal) => Json(ChatResponse {
                reply: meal.voice_summary.clone(),
                data: Some(meal),
            })
            .into_response(),
            Err(VoiceError::MalformedResponse(reason)) => {
                error!("[chat] Finalize reply rejected ({}): {}", reason, raw);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Chat failed",
                    Some("Invalid JSON from model".to_string()),
                )
            }
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Chat failed",
                Some(e.to_string()),
            ),
        },
    }
}

/// GET /api/voices
/// Account voices, fetched once and cached for the life of the process
pub async fn list_voices(State(state): State<AppState>) -> Response {
    if let Some(voices) = state.voices.read().await.as_ref() {
        return Json(voices.clone()).into_response();
    }

    let mut cache = state.voices.write().await;
    if let Some(voices) = cache.as_ref() {
        return Json(voices.clone()).into_response();
    }

    let voices = match state.catalog.list_voices().await {
        Ok(voices) => {
            info!("[voices] Loaded {} voices", voices.len());
            voices
        }
        Err(e) => {
            error!("[voices] Failed to fetch voices: {}", e);
            state
                .default_voice_id
                .iter()
                .map(|id| VoiceOption::fallback(id.clone()))
                .collect()
        }
    };

    *cache = Some(voices.clone());
    Json(voices).into_response()
}

/// GET /api/patterns
pub async fn patterns(State(state): State<AppState>) -> Response {
    Json(state.patterns.as_ref()).into_response()
}
