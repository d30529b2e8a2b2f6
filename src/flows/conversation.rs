//! Free conversation practice with the learner's persona.
//!
//! Unlike the lesson flows, upstream failures surface to the caller so the UI
//! can tell the learner the partner is unavailable.

use super::FlowError;
use crate::level::Level;
use crate::llm::{ChatMessage, ChatModel, ChunkReceiver, Role};
use crate::pipeline::{
    fallback::ARABIC_APOLOGY, templates, AiExchange, Outcome, Pipeline, PromptBuilder, UpstreamPolicy,
};
use crate::state::Persona;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConversationRequest {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
    #[serde(default)]
    pub level: Level,
}

/// System turns in the supplied history are dropped; the persona owns the
/// system instruction.
pub fn build_prompt(persona: &Persona, request: &ConversationRequest) -> PromptBuilder {
    let history = request
        .history
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned();

    PromptBuilder::new(templates::conversation_system(
        &persona.name,
        &persona.style,
        request.level,
    ))
    .history(history)
    .user(request.message.as_str())
}

#[instrument(skip_all, fields(persona = %persona.name, turns = request.history.len()))]
pub async fn reply(
    model: &dyn ChatModel,
    persona: &Persona,
    request: &ConversationRequest,
    max_tokens: u32,
) -> Result<Outcome<String>, FlowError> {
    let pipeline = Pipeline::new("conversation", model, max_tokens).with_temperature(persona.temperature);
    let exchange = AiExchange::from_builder(build_prompt(persona, request));

    let outcome = pipeline
        .run_text(exchange, ARABIC_APOLOGY, UpstreamPolicy::Propagate)
        .await?;
    Ok(outcome)
}

/// Dropping the returned receiver cancels the upstream read.
#[instrument(skip_all, fields(persona = %persona.name))]
pub async fn reply_stream(
    model: &dyn ChatModel,
    persona: &Persona,
    request: &ConversationRequest,
    max_tokens: u32,
) -> Result<ChunkReceiver, FlowError> {
    let chat_request = AiExchange::from_builder(build_prompt(persona, request))
        .request(max_tokens)
        .with_temperature(persona.temperature);

    let receiver = model.stream(&chat_request).await?;
    debug!("Conversation stream opened");
    Ok(receiver)
}
