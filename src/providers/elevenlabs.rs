//! ElevenLabs REST client: speech-to-text, text-to-speech and voice listing.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{SpeechSynthesizer, Transcriber, VoiceCatalog};
use crate::audio::{AudioClip, SpeechAudio};
use crate::config::ElevenLabsConfig;
use crate::error::VoiceError;

const API_KEY_HEADER: &str = "xi-api-key";

/// A selectable voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceOption {
    pub id: String,
    pub label: String,
    pub name: String,
    pub preview_url: Option<String>,
}

impl VoiceOption {
    /// Entry used when the account voices cannot be listed
    pub fn fallback(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: "Default".to_string(),
            name: "Default".to_string(),
            preview_url: None,
        }
    }
}

/// Pick the voice for a request: a real requested id wins, otherwise the
/// default. Browsers send the strings `"null"`/`"undefined"` for unset ids.
pub fn resolve_voice_id(requested: Option<&str>, default: Option<&str>) -> Option<String> {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "null" && *id != "undefined")
        .or(default.map(str::trim).filter(|id| !id.is_empty()))
        .map(str::to_string)
}

#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    default_voice_id: Option<String>,
    stt_model: String,
    tts_model: String,
    stability: f32,
    similarity_boost: f32,
    max_voices: usize,
}

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Deserialize)]
struct SpeechToTextResponse {
    text: Option<String>,
    transcript: Option<String>,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<AccountVoice>,
}

#[derive(Deserialize)]
struct AccountVoice {
    voice_id: String,
    name: String,
    preview_url: Option<String>,
}

impl ElevenLabsClient {
    pub fn new(config: &ElevenLabsConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_voice_id: config.voice_id.clone(),
            stt_model: config.stt_model.clone(),
            tts_model: config.tts_model.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            max_voices: config.max_voices,
        }
    }

    pub fn default_voice_id(&self) -> Option<&str> {
        self.default_voice_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        format!("status {}: {}", status, body)
    }
}

#[async_trait::async_trait]
impl Transcriber for ElevenLabsClient {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        debug!(
            "Sending {} bytes of {} to speech-to-text",
            clip.bytes.len(),
            clip.mime_type
        );

        let part = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name())
            .mime_str(&clip.mime_type)
            .map_err(|e| VoiceError::transcription(format!("invalid audio part: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("model_id", self.stt_model.clone());

        let response = self
            .client
            .post(self.url("speech-to-text"))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::transcription(format!("STT request failed: {e}")))?;

        if !response.status().is_success() {
            let detail = Self::error_body(response).await;
            error!("[STT] ElevenLabs error {}", detail);
            return Err(VoiceError::transcription(detail));
        }

        let body: SpeechToTextResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::transcription(format!("unreadable STT response: {e}")))?;

        Ok(body.text.or(body.transcript).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<SpeechAudio, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::speech("empty text"));
        }
        let voice = resolve_voice_id(voice_id, self.default_voice_id.as_deref())
            .ok_or_else(|| VoiceError::speech("no voice id configured"))?;

        info!(
            "[TTS] Calling ElevenLabs, voice: {}, text length: {}",
            voice,
            text.len()
        );

        let request = TextToSpeechRequest {
            text,
            model_id: &self.tts_model,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        let response = self
            .client
            .post(self.url(&format!("text-to-speech/{voice}")))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::speech(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let detail = Self::error_body(response).await;
            error!("[TTS] ElevenLabs error {}", detail);
            return Err(VoiceError::speech(detail));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::speech(format!("failed to read TTS audio: {e}")))?;
        info!("[TTS] Success, {} bytes", bytes.len());

        Ok(SpeechAudio::mpeg(bytes.to_vec()))
    }
}

#[async_trait::async_trait]
impl VoiceCatalog for ElevenLabsClient {
    async fn list_voices(&self) -> Result<Vec<VoiceOption>, VoiceError> {
        let response = self
            .client
            .get(self.url("voices"))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| VoiceError::speech(format!("voices request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(VoiceError::speech(format!(
                "ElevenLabs voices error {}",
                response.status()
            )));
        }

        let body: VoicesResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::speech(format!("unreadable voices response: {e}")))?;

        Ok(body
            .voices
            .into_iter()
            .take(self.max_voices)
            .map(|v| VoiceOption {
                id: v.voice_id,
                label: v.name.clone(),
                name: v.name,
                preview_url: v.preview_url,
            })
            .collect())
    }
}
