//! AI-tutor reply wrapper.
//!
//! Builds tutor requests from configuration and turns every failure
//! (collaborator error, empty answer, deadline) into a fixed apology so chat
//! panels never show an error dialog.

use crate::config::TutorConfig;
use crate::spi::tutor::{ChatMessage, TutorClient, TutorRequest, TutorResponse};
use crate::spi::with_deadline;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// User-facing text shown when the tutor cannot answer.
pub const TUTOR_APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Text shown in the chat panel for one tutor turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    pub text: String,
    /// `false` when `text` is the apology rather than a model answer.
    pub answered: bool,
}

pub struct TutorService {
    client: Arc<dyn TutorClient>,
    config: TutorConfig,
    deadline: Option<Duration>,
}

impl TutorService {
    pub fn new(client: Arc<dyn TutorClient>, config: TutorConfig, deadline: Option<Duration>) -> Self {
        Self {
            client,
            config,
            deadline,
        }
    }

    /// Sends the conversation so far and returns displayable text.
    pub async fn reply(&self, messages: Vec<ChatMessage>) -> TutorReply {
        let request = TutorRequest {
            messages,
            system_prompt: self.config.system_prompt.clone(),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
        };
        let turns = request.messages.len();

        let response = match with_deadline(self.deadline, async {
            Ok(self.client.generate_response(&request).await)
        })
        .await
        {
            Ok(response) => response,
            Err(err) => TutorResponse::failed(err.to_string()),
        };

        if response.success && !response.content.trim().is_empty() {
            info!(
                "event=tutor_reply module=tutor status=ok model={} turns={} chars={}",
                self.config.model,
                turns,
                response.content.chars().count()
            );
            return TutorReply {
                text: response.content,
                answered: true,
            };
        }

        warn!(
            "event=tutor_reply module=tutor status=error model={} turns={} error={}",
            self.config.model,
            turns,
            response.error.as_deref().unwrap_or("empty response")
        );
        TutorReply {
            text: TUTOR_APOLOGY.to_string(),
            answered: false,
        }
    }
}
