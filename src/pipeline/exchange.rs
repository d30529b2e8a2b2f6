//! The per-call AI exchange record.

use super::builder::PromptBuilder;
use super::coerce::{Coerced, CoercionNote};
use super::extract::Extractor;
use crate::llm::{ChatMessage, ChatRequest, Role};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    Valid,
    Coerced,
    Failed,
}

/// One request/response round trip. Lives for a single flow call and is never
/// persisted. `parsed_payload` is only set by [`AiExchange::extract`], and only
/// when the raw text held a parsable JSON span.
#[derive(Debug, Clone, Serialize)]
pub struct AiExchange {
    system_instruction: String,
    messages: Vec<ChatMessage>,
    raw_response_text: String,
    parsed_payload: Option<Value>,
    validation_outcome: Option<ValidationOutcome>,
    notes: Vec<CoercionNote>,
}

impl AiExchange {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Self {
            system_instruction,
            messages,
            raw_response_text: String::new(),
            parsed_payload: None,
            validation_outcome: None,
            notes: Vec::new(),
        }
    }

    pub fn from_builder(builder: PromptBuilder) -> Self {
        Self::new(builder.build())
    }

    pub fn request(&self, max_tokens: u32) -> ChatRequest {
        ChatRequest::new(self.messages.clone()).with_max_tokens(max_tokens)
    }

    pub fn record_response(&mut self, text: impl Into<String>) {
        self.raw_response_text = text.into();
    }

    pub fn extract(&mut self, extractor: Extractor) -> Option<&Value> {
        self.parsed_payload = extractor.extract(&self.raw_response_text);
        self.parsed_payload.as_ref()
    }

    /// Record the validator's verdict and hand back the value, if any.
    pub fn settle<T>(&mut self, coerced: Coerced<T>) -> Option<T> {
        self.validation_outcome = Some(coerced.outcome());
        self.notes = coerced.notes().to_vec();
        coerced.value()
    }

    pub fn fail(&mut self) {
        self.validation_outcome = Some(ValidationOutcome::Failed);
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn raw_response_text(&self) -> &str {
        &self.raw_response_text
    }

    pub fn parsed_payload(&self) -> Option<&Value> {
        self.parsed_payload.as_ref()
    }

    pub fn validation_outcome(&self) -> Option<ValidationOutcome> {
        self.validation_outcome
    }

    pub fn notes(&self) -> &[CoercionNote] {
        &self.notes
    }

    pub fn is_fallback(&self) -> bool {
        self.validation_outcome == Some(ValidationOutcome::Failed)
    }
}
