use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::patterns::{MealHistory, PatternsReport};
use crate::providers::{
    ChatModel, ElevenLabsClient, GeminiClient, SpeechSynthesizer, Transcriber, VoiceCatalog,
    VoiceOption,
};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub catalog: Arc<dyn VoiceCatalog>,
    pub chat: Arc<dyn ChatModel>,

    /// Voice used when a request names none
    pub default_voice_id: Option<String>,

    /// Voice list, fetched once
    pub voices: Arc<RwLock<Option<Vec<VoiceOption>>>>,

    /// Patterns report over the bundled history
    pub patterns: Arc<PatternsReport>,

    /// Directory served for every non-API path
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        catalog: Arc<dyn VoiceCatalog>,
        chat: Arc<dyn ChatModel>,
        patterns: PatternsReport,
    ) -> Self {
        Self {
            transcriber,
            synthesizer,
            catalog,
            chat,
            default_voice_id: None,
            voices: Arc::new(RwLock::new(None)),
            patterns: Arc::new(patterns),
            static_dir: None,
        }
    }

    /// Vendor-backed state built from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let elevenlabs = Arc::new(ElevenLabsClient::new(&config.elevenlabs));
        let gemini = Arc::new(GeminiClient::new(&config.gemini));
        let history = MealHistory::bundled()?;

        let mut state = Self::new(
            elevenlabs.clone(),
            elevenlabs.clone(),
            elevenlabs.clone(),
            gemini,
            PatternsReport::build(&history),
        );
        state.default_voice_id = elevenlabs.default_voice_id().map(str::to_string);
        state.static_dir = config.service.static_dir.as_ref().map(PathBuf::from);
        Ok(state)
    }

    pub fn with_default_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.default_voice_id = Some(voice_id.into());
        self
    }
}
