//! Named server-side operations called by the UI.
//!
//! | flow           | on unusable reply        | on upstream error |
//! |----------------|--------------------------|-------------------|
//! | quiz           | retry ×2, dummy question | retry, then dummy |
//! | exam           | dummy-padded exam        | fallback          |
//! | image(s)       | placeholder image URL    | fallback          |
//! | lesson / story | Arabic apology           | fallback          |
//! | conversation   | Arabic apology           | propagate         |
//! | retrieval      | first document           | first document    |
//! | speech         | n/a                      | propagate         |

pub mod conversation;
pub mod exam;
pub mod image;
pub mod lesson;
pub mod quiz;
pub mod retrieval;
pub mod speech;

#[cfg(test)]
pub(crate) mod stub;

use crate::config::ConfigurationError;
use crate::llm::UpstreamError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to serialize flow result: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub use conversation::ConversationRequest;
pub use exam::{ExamQuestion, ExamRequest, ExamSettings};
pub use image::ImageResult;
pub use lesson::{LessonExplanation, LessonRequest, Story, StoryRequest, VocabularyItem};
pub use quiz::{QuizQuestion, QuizRequest, QuizSettings};
