use std::sync::Arc;
use tracing::{info, warn};

use super::{ChatMessage, ChatModel, ChatPhase, Dialogue};
use crate::error::VoiceError;
use crate::meal::{parse_finalize_reply, FinalizedMeal};
use crate::session::Turn;

/// `Dialogue` on top of any chat model
#[derive(Clone)]
pub struct ModelDialogue {
    model: Arc<dyn ChatModel>,
}

impl ModelDialogue {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait::async_trait]
impl Dialogue for ModelDialogue {
    async fn ask_clarifying_question(&self, utterance: &str) -> Result<String, VoiceError> {
        let reply = self
            .model
            .complete(ChatPhase::Clarify, &[ChatMessage::user(utterance)])
            .await?;

        let question = reply.trim();
        if question.is_empty() {
            return Err(VoiceError::dialogue("model returned an empty question"));
        }
        Ok(question.to_string())
    }

    async fn finalize(&self, turns: &[Turn]) -> Result<FinalizedMeal, VoiceError> {
        let messages: Vec<ChatMessage> = turns.iter().map(ChatMessage::from).collect();
        let reply = self.model.complete(ChatPhase::Finalize, &messages).await?;

        match parse_finalize_reply(&reply) {
            Ok(meal) => {
                info!("Finalized meal: {}", meal.summary);
                Ok(meal)
            }
            Err(e) => {
                warn!("Finalize reply rejected: {} (raw: {})", e, reply);
                Err(e)
            }
        }
    }
}
