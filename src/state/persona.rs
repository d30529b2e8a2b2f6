//! Conversation partner persona, stored as TOML:
//!
//! ```toml
//! [metadata]
//! description = "Friendly tutor"
//!
//! [personality]
//! name = "Sarah"
//! style = "warm, patient, encouraging"
//!
//! [settings]
//! temperature = 0.7
//! ```

use super::StateError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Persona {
    pub name: String,
    pub style: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Sarah".to_string(),
            style: "warm, patient and encouraging".to_string(),
            description: "Friendly English tutor for Arabic speakers".to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Deserialize)]
struct PersonaFile {
    #[serde(default)]
    metadata: Metadata,
    personality: Personality,
    #[serde(default)]
    settings: PersonaSettings,
}

#[derive(Deserialize, Default)]
struct Metadata {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct Personality {
    name: String,
    style: String,
}

#[derive(Deserialize)]
struct PersonaSettings {
    #[serde(default = "default_temperature")]
    temperature: f32,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Persona {
    pub fn from_toml_str(content: &str) -> Result<Self, StateError> {
        let file: PersonaFile = toml::from_str(content)?;
        Ok(Self {
            name: file.personality.name,
            style: file.personality.style,
            description: file.metadata.description,
            temperature: file.settings.temperature,
        })
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
