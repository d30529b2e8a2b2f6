//! Assembles the message list for one chat call.

use crate::llm::{ChatMessage, Role};

/// System instruction first, prior turns in their original order, the new
/// user turn last. No validation is done on the contents.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    system: String,
    history: Vec<ChatMessage>,
    user: Option<String>,
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            history: Vec::new(),
            user: None,
        }
    }

    pub fn history<I>(mut self, turns: I) -> Self
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        self.history.extend(turns);
        self
    }

    pub fn turn(mut self, role: Role, content: impl Into<String>) -> Self {
        self.history.push(ChatMessage::new(role, content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.user = Some(content.into());
        self
    }

    pub fn system_instruction(&self) -> &str {
        &self.system
    }

    pub fn build(self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system));
        messages.extend(self.history);
        if let Some(user) = self.user {
            messages.push(ChatMessage::user(user));
        }
        messages
    }
}
