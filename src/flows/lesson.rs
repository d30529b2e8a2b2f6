//! Lesson explanations and graded-reader stories.

use crate::level::Level;
use crate::llm::ChatModel;
use crate::pipeline::coerce::{array_at, parse_items, require_keys};
use crate::pipeline::{
    fallback::ARABIC_APOLOGY, templates, AiExchange, Coerced, CoercionNote, Extractor, Outcome,
    Pipeline, PromptBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LessonRequest {
    pub topic: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub lesson_text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LessonExplanation {
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoryRequest {
    pub topic: String,
    #[serde(default)]
    pub level: Level,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VocabularyItem {
    pub word: String,
    pub meaning: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
}

impl Story {
    pub fn apology(topic: &str) -> Self {
        Self {
            title: topic.to_string(),
            content: ARABIC_APOLOGY.to_string(),
            vocabulary: Vec::new(),
        }
    }
}

#[instrument(skip(model, request), fields(topic = %request.topic))]
pub async fn explain_lesson(
    model: &dyn ChatModel,
    request: &LessonRequest,
    max_tokens: u32,
) -> Outcome<LessonExplanation> {
    let pipeline = Pipeline::new("lesson", model, max_tokens);
    let exchange = AiExchange::from_builder(
        PromptBuilder::new(templates::lesson_system()).user(templates::lesson_user(
            &request.topic,
            request.level,
            &request.lesson_text,
        )),
    );

    let outcome = pipeline.text_or_fallback(exchange, ARABIC_APOLOGY).await;
    Outcome {
        value: LessonExplanation {
            explanation: outcome.value,
        },
        exchange: outcome.exchange,
    }
}

/// `title` and `content` must be non-empty strings. Malformed vocabulary
/// entries are dropped rather than failing the story.
pub fn validate_story(payload: &Value) -> Coerced<Story> {
    if let Err(failure) = require_keys(payload, &["title", "content"]) {
        return failure.into();
    }

    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let (title, content) = match (text("title"), text("content")) {
        (Some(title), Some(content)) => (title, content),
        _ => return Coerced::Rejected("story title or content is empty".to_string()),
    };

    let vocabulary = match array_at(payload, "vocabulary") {
        Some(items) => parse_items::<VocabularyItem>(items),
        None if payload.get("vocabulary").is_some() => Coerced::with_notes(
            Vec::new(),
            vec![CoercionNote::Dropped {
                index: 0,
                reason: "vocabulary is not an array".to_string(),
            }],
        ),
        None => Coerced::Valid(Vec::new()),
    };

    vocabulary.map(|vocabulary| Story {
        title,
        content,
        vocabulary,
    })
}

#[instrument(skip(model, request), fields(topic = %request.topic))]
pub async fn generate_story(model: &dyn ChatModel, request: &StoryRequest, max_tokens: u32) -> Outcome<Story> {
    let pipeline = Pipeline::new("story", model, max_tokens);
    let exchange = AiExchange::from_builder(
        PromptBuilder::new(templates::story_system())
            .user(templates::story_user(&request.topic, request.level)),
    );

    pipeline
        .run_or_fallback(exchange, Extractor::Braces, validate_story, || {
            Story::apology(&request.topic)
        })
        .await
}
