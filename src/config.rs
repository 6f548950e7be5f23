use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix of environment overrides, e.g. `SATIETY_ELEVENLABS__API_KEY`
pub const ENV_PREFIX: &str = "SATIETY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Directory of the web front-end, served for unmatched paths
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    /// Voice used when a request names none
    pub voice_id: Option<String>,
    pub base_url: String,
    pub stt_model: String,
    pub tts_model: String,
    pub stability: f32,
    pub similarity_boost: f32,
    /// How many account voices `/api/voices` returns
    pub max_voices: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Config {
    /// Load defaults, then `path` (any extension `config` understands, optional),
    /// then `SATIETY_*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Defaults only, no file and no environment
    pub fn defaults() -> Result<Self> {
        Self::builder()?
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "satiety")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3000)?
            .set_default("elevenlabs.api_key", "")?
            .set_default("elevenlabs.base_url", "https://api.elevenlabs.io")?
            .set_default("elevenlabs.stt_model", "scribe_v1")?
            .set_default("elevenlabs.tts_model", "eleven_turbo_v2")?
            .set_default("elevenlabs.stability", 0.5)?
            .set_default("elevenlabs.similarity_boost", 0.75)?
            .set_default("elevenlabs.max_voices", 8)?
            .set_default("gemini.api_key", "")?
            .set_default("gemini.model", "gemini-2.5-flash")?
            .set_default(
                "gemini.base_url",
                "https://generativelanguage.googleapis.com/v1beta/models",
            )?)
    }

    /// `bind:port` for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
