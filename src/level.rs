use serde::{Deserialize, Serialize};

/// Learner proficiency, used to pitch prompts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_prompt(&self) -> &'static str {
        match self {
            Level::Beginner => "a beginner (CEFR A1-A2); use short sentences and very common words",
            Level::Intermediate => "an intermediate learner (CEFR B1-B2); use everyday vocabulary",
            Level::Advanced => "an advanced learner (CEFR C1); natural, idiomatic English is fine",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Intermediate).unwrap(), "\"intermediate\"");
    }
}
