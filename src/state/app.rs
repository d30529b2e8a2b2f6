use super::persona::Persona;
use crate::flows::Story;
use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

/// Oldest stories are evicted past this count.
pub const MAX_SAVED_STORIES: usize = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppState {
    pub persona: Persona,
    pub settings: Settings,
    pub progress: Progress,
    pub saved_stories: VecDeque<SavedStory>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub level: Level,
    pub speech_rate: f32,
    pub show_transliteration: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: Level::default(),
            speech_rate: 1.0,
            show_transliteration: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: u32,
    pub total: u32,
    pub taken_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Progress {
    pub completed_lessons: BTreeSet<String>,
    /// Latest score per lesson.
    pub quiz_scores: BTreeMap<String, QuizScore>,
}

impl Progress {
    pub fn complete_lesson(&mut self, lesson: &str) -> bool {
        self.completed_lessons.insert(lesson.to_string())
    }

    pub fn record_quiz(&mut self, lesson: &str, correct: u32, total: u32) {
        self.quiz_scores.insert(
            lesson.to_string(),
            QuizScore {
                correct: correct.min(total),
                total,
                taken_at: Utc::now(),
            },
        );
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SavedStory {
    pub id: Uuid,
    pub story: Story,
    pub saved_at: DateTime<Utc>,
}

impl AppState {
    pub fn save_story(&mut self, story: Story) -> Uuid {
        let id = Uuid::new_v4();
        self.saved_stories.push_back(SavedStory {
            id,
            story,
            saved_at: Utc::now(),
        });
        while self.saved_stories.len() > MAX_SAVED_STORIES {
            self.saved_stories.pop_front();
        }
        id
    }

    pub fn remove_story(&mut self, id: Uuid) -> bool {
        let before = self.saved_stories.len();
        self.saved_stories.retain(|s| s.id != id);
        self.saved_stories.len() != before
    }
}
