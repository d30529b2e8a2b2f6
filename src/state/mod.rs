//! Client-side preference state: persona, settings, progress and saved
//! stories. Loaded once at start and written back on every mutation.

pub mod app;
pub mod persistence;
pub mod persona;
pub mod store;

pub use app::{AppState, Progress, QuizScore, SavedStory, Settings, MAX_SAVED_STORIES};
pub use persistence::{JsonFilePort, MemoryPort, PersistencePort};
pub use persona::Persona;
pub use store::StateStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("State I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("State is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to replace state file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Persona file is invalid: {0}")]
    Persona(#[from] toml::de::Error),
    #[error("Background write did not finish: {0}")]
    Task(String),
}
