//! Final exam: exactly `length` questions, short sets padded with a fixed
//! review question rather than by repetition.

use crate::config::FlowConfig;
use crate::llm::ChatModel;
use crate::pipeline::coerce::{
    array_at, cap_options, non_empty, pad_with_dummy, parse_items, retain_answerable, truncate,
};
use crate::pipeline::{
    fallback, templates, AiExchange, Answerable, Coerced, Extractor, Outcome, Pipeline, PromptBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExamQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "answer")]
    pub correct_answer: String,
}

impl Answerable for ExamQuestion {
    fn options(&self) -> &[String] {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Vec<String> {
        &mut self.options
    }

    fn answer(&self) -> &str {
        &self.correct_answer
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExamRequest {
    pub lessons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExamSettings {
    pub length: usize,
    pub options: usize,
    pub max_tokens: u32,
}

impl From<&FlowConfig> for ExamSettings {
    fn from(config: &FlowConfig) -> Self {
        Self {
            length: config.exam_length,
            options: config.options_per_question,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self::from(&FlowConfig::default())
    }
}

pub fn validate_exam(payload: &Value, length: usize, options: usize) -> Coerced<Vec<ExamQuestion>> {
    let items = match array_at(payload, "questions") {
        Some(items) => items,
        None => return Coerced::Rejected("payload has no questions array".to_string()),
    };
    let dummy = fallback::dummy_exam_question();

    parse_items::<ExamQuestion>(items)
        .and_then(|qs| cap_options(qs, options))
        .and_then(retain_answerable)
        .and_then(|qs| non_empty(qs, "exam questions"))
        .and_then(|qs| truncate(qs, length))
        .and_then(|qs| pad_with_dummy(qs, length, &dummy))
}

/// The fallback exam: `length` copies of the review question.
pub fn placeholder_exam(length: usize) -> Vec<ExamQuestion> {
    vec![fallback::dummy_exam_question(); length]
}

#[instrument(skip(model, request, settings), fields(lessons = request.lessons.len()))]
pub async fn generate_exam(
    model: &dyn ChatModel,
    request: &ExamRequest,
    settings: &ExamSettings,
) -> Outcome<Vec<ExamQuestion>> {
    let pipeline = Pipeline::new("exam", model, settings.max_tokens);
    let exchange = AiExchange::from_builder(
        PromptBuilder::new(templates::exam_system()).user(templates::exam_user(
            &request.lessons,
            settings.length,
            settings.options,
        )),
    );

    let length = settings.length;
    let options = settings.options;
    pipeline
        .run_or_fallback(
            exchange,
            Extractor::ObjectOrArray,
            |payload| validate_exam(payload, length, options),
            || placeholder_exam(length),
        )
        .await
}
