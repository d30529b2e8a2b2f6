//! Lesson quiz: exactly `length` answerable questions.
//!
//! Unanswerable questions are dropped, extras truncated, and a short set is
//! padded by cycling the questions that survived. When an attempt yields
//! nothing usable the whole flow is retried with a flat delay.

use crate::config::FlowConfig;
use crate::level::Level;
use crate::llm::ChatModel;
use crate::pipeline::coerce::{
    array_at, cap_options, non_empty, pad_cycling, parse_items, retain_answerable, truncate,
};
use crate::pipeline::{
    fallback, templates, AiExchange, Answerable, Coerced, Extractor, Outcome, Pipeline, PromptBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correct_answer")]
    pub answer: String,
}

impl Answerable for QuizQuestion {
    fn options(&self) -> &[String] {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Vec<String> {
        &mut self.options
    }

    fn answer(&self) -> &str {
        &self.answer
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizRequest {
    pub topic: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub lesson_text: String,
}

#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub length: usize,
    pub options: usize,
    pub retries: u32,
    pub retry_delay: Duration,
    pub max_tokens: u32,
}

impl From<&FlowConfig> for QuizSettings {
    fn from(config: &FlowConfig) -> Self {
        Self {
            length: config.quiz_length,
            options: config.options_per_question,
            retries: config.quiz_retries,
            retry_delay: Duration::from_millis(config.quiz_retry_delay_ms),
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

pub fn build_prompt(request: &QuizRequest, settings: &QuizSettings) -> PromptBuilder {
    PromptBuilder::new(templates::quiz_system()).user(templates::quiz_user(
        &request.topic,
        request.level,
        &request.lesson_text,
        settings.length,
        settings.options,
    ))
}

pub fn validate_quiz(payload: &Value, length: usize, options: usize) -> Coerced<Vec<QuizQuestion>> {
    let items = match array_at(payload, "questions") {
        Some(items) => items,
        None => return Coerced::Rejected("payload has no questions array".to_string()),
    };

    parse_items::<QuizQuestion>(items)
        .and_then(|qs| cap_options(qs, options))
        .and_then(retain_answerable)
        .and_then(|qs| non_empty(qs, "questions"))
        .and_then(|qs| truncate(qs, length))
        .and_then(|qs| pad_cycling(qs, length))
}

#[instrument(skip(model, request, settings), fields(topic = %request.topic))]
pub async fn generate_quiz(
    model: &dyn ChatModel,
    request: &QuizRequest,
    settings: &QuizSettings,
) -> Outcome<Vec<QuizQuestion>> {
    let pipeline = Pipeline::new("quiz", model, settings.max_tokens);
    let mut last_exchange = None;

    for attempt in 0..=settings.retries {
        if attempt > 0 {
            tokio::time::sleep(settings.retry_delay).await;
        }

        let mut exchange = AiExchange::from_builder(build_prompt(request, settings));
        let result = pipeline
            .attempt(&mut exchange, Extractor::ObjectOrArray, |payload| {
                validate_quiz(payload, settings.length, settings.options)
            })
            .await;

        match result {
            Ok(Some(questions)) => {
                info!(attempt, questions = questions.len(), "Quiz generated");
                return Outcome {
                    value: questions,
                    exchange,
                };
            }
            Ok(None) => warn!(attempt, "Quiz attempt produced no usable questions"),
            Err(e) => warn!(attempt, error = %e, "Quiz attempt failed upstream"),
        }
        last_exchange = Some(exchange);
    }

    let exchange =
        last_exchange.unwrap_or_else(|| AiExchange::from_builder(build_prompt(request, settings)));
    pipeline.fall_back(exchange, || vec![fallback::dummy_quiz_question()])
}
