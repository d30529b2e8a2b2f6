//! # Exchange pipeline
//!
//! ```text
//! PromptBuilder → ChatModel::complete → Extractor → validator → (value | fallback)
//! ```
//!
//! Extraction and validation failures never escape this module: they mark the
//! exchange `Failed` and the caller's fallback value is returned instead.
//! Upstream errors either propagate or fold into the fallback, depending on the
//! flow's [`UpstreamPolicy`].

pub mod builder;
pub mod coerce;
pub mod exchange;
pub mod extract;
pub mod fallback;
pub mod templates;

pub use builder::PromptBuilder;
pub use coerce::{Answerable, Coerced, CoercionNote, ValidationFailure};
pub use exchange::{AiExchange, ValidationOutcome};
pub use extract::{extract_json, extract_json_array, extract_json_regex, Extractor};

use crate::llm::{ChatModel, UpstreamError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamPolicy {
    /// Surface upstream errors to the caller.
    Propagate,
    /// Replace upstream errors with the fallback value.
    Fallback,
}

/// A flow result together with the exchange that produced it.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub exchange: AiExchange,
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        self.exchange.is_fallback()
    }
}

pub struct Pipeline<'a> {
    flow: &'static str,
    model: &'a dyn ChatModel,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl<'a> Pipeline<'a> {
    pub fn new(flow: &'static str, model: &'a dyn ChatModel, max_tokens: u32) -> Self {
        Self {
            flow,
            model,
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn flow(&self) -> &'static str {
        self.flow
    }

    #[instrument(skip_all, fields(flow = self.flow))]
    pub async fn invoke(&self, exchange: &mut AiExchange) -> Result<(), UpstreamError> {
        let mut request = exchange.request(self.max_tokens);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        let text = self.model.complete(&request).await?;
        debug!(response_len = text.len(), "Model replied");
        exchange.record_response(text);
        Ok(())
    }

    /// Invoke, extract and validate once. `Ok(None)` means the reply was
    /// unusable and the exchange is marked failed.
    pub async fn attempt<T, V>(
        &self,
        exchange: &mut AiExchange,
        extractor: Extractor,
        validate: V,
    ) -> Result<Option<T>, UpstreamError>
    where
        V: FnOnce(&Value) -> Coerced<T>,
    {
        self.invoke(exchange).await?;

        let coerced = match exchange.extract(extractor) {
            Some(payload) => validate(payload),
            None => Coerced::Rejected("no JSON payload in response".to_string()),
        };

        match &coerced {
            Coerced::Rejected(reason) => {
                warn!(flow = self.flow, reason = %reason, "Model reply rejected")
            }
            Coerced::Coerced(_, notes) => {
                debug!(flow = self.flow, notes = notes.len(), "Model reply coerced")
            }
            Coerced::Valid(_) => {}
        }

        Ok(exchange.settle(coerced))
    }

    /// One attempt, falling back when the reply is unusable.
    pub async fn run<T, V, F>(
        &self,
        mut exchange: AiExchange,
        extractor: Extractor,
        validate: V,
        fallback: F,
        policy: UpstreamPolicy,
    ) -> Result<Outcome<T>, UpstreamError>
    where
        V: FnOnce(&Value) -> Coerced<T>,
        F: FnOnce() -> T,
    {
        match self.attempt(&mut exchange, extractor, validate).await {
            Ok(Some(value)) => Ok(Outcome { value, exchange }),
            Ok(None) => Ok(self.fall_back(exchange, fallback)),
            Err(e) if policy == UpstreamPolicy::Fallback => {
                warn!(flow = self.flow, error = %e, "Upstream failed, using fallback");
                Ok(self.fall_back(exchange, fallback))
            }
            Err(e) => Err(e),
        }
    }

    /// [`Pipeline::run`] under [`UpstreamPolicy::Fallback`], which cannot fail.
    pub async fn run_or_fallback<T, V, F>(
        &self,
        mut exchange: AiExchange,
        extractor: Extractor,
        validate: V,
        fallback: F,
    ) -> Outcome<T>
    where
        V: FnOnce(&Value) -> Coerced<T>,
        F: FnOnce() -> T,
    {
        match self.attempt(&mut exchange, extractor, validate).await {
            Ok(Some(value)) => Outcome { value, exchange },
            Ok(None) => self.fall_back(exchange, fallback),
            Err(e) => {
                warn!(flow = self.flow, error = %e, "Upstream failed, using fallback");
                self.fall_back(exchange, fallback)
            }
        }
    }

    /// Prose replies: the only check is that the model said something.
    pub async fn run_text(
        &self,
        mut exchange: AiExchange,
        fallback: &str,
        policy: UpstreamPolicy,
    ) -> Result<Outcome<String>, UpstreamError> {
        match self.invoke(&mut exchange).await {
            Ok(()) => Ok(self.settle_text(exchange, fallback)),
            Err(e) if policy == UpstreamPolicy::Fallback => {
                warn!(flow = self.flow, error = %e, "Upstream failed, using fallback");
                Ok(self.fall_back(exchange, || fallback.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn text_or_fallback(&self, mut exchange: AiExchange, fallback: &str) -> Outcome<String> {
        match self.invoke(&mut exchange).await {
            Ok(()) => self.settle_text(exchange, fallback),
            Err(e) => {
                warn!(flow = self.flow, error = %e, "Upstream failed, using fallback");
                self.fall_back(exchange, || fallback.to_string())
            }
        }
    }

    fn settle_text(&self, mut exchange: AiExchange, fallback: &str) -> Outcome<String> {
        let text = exchange.raw_response_text().trim().to_string();
        let coerced = if text.is_empty() {
            Coerced::Rejected("empty reply".to_string())
        } else {
            Coerced::Valid(text)
        };

        match exchange.settle(coerced) {
            Some(value) => Outcome { value, exchange },
            None => self.fall_back(exchange, || fallback.to_string()),
        }
    }

    pub fn fall_back<T, F: FnOnce() -> T>(&self, mut exchange: AiExchange, fallback: F) -> Outcome<T> {
        exchange.fail();
        warn!(flow = self.flow, "Returning fallback value");
        Outcome {
            value: fallback(),
            exchange,
        }
    }
}

#[cfg(test)]
mod tests;
