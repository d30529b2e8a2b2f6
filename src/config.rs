//! Process configuration: defaults, an optional TOML file, then environment.
//!
//! Credentials are optional at load time. A flow that needs a provider asks for
//! its [`Credentials`] when it runs and gets a [`ConfigurationError`] if they
//! are missing.

use crate::llm::{ImageShape, ResponseShape};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

pub const CONFIG_PATH_VAR: &str = "LINGO_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing credential for {provider}: set {variable}")]
    MissingCredential {
        provider: &'static str,
        variable: String,
    },
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
    #[error("Invalid URL in {variable}: {reason}")]
    InvalidUrl { variable: String, reason: String },
    #[error("Invalid value for {variable}: {value}")]
    InvalidValue { variable: String, value: String },
    #[error("Failed to read config file {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chat: ProviderConfig,
    pub image: ImageProviderConfig,
    pub rerank: ProviderConfig,
    pub speech: SpeechConfig,
    pub kv: KvConfig,
    pub flow: FlowConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub response_shape: ResponseShape,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ImageProviderConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub response_shape: ImageShape,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    pub stt_url: Option<String>,
    pub tts_url: Option<String>,
    pub api_key: Option<String>,
    pub sample_rate: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct KvConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Entries kept by the in-process store when no remote KV is configured.
    pub memory_capacity: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FlowConfig {
    pub quiz_length: usize,
    pub quiz_retries: u32,
    pub quiz_retry_delay_ms: u64,
    pub exam_length: usize,
    pub options_per_question: usize,
    pub max_tokens: u32,
    pub placeholder_image_base: String,
}

/// Resolved endpoint, key and model for one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
    pub model: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            stt_url: None,
            tts_url: None,
            api_key: None,
            sample_rate: 24_000,
        }
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            memory_capacity: 1024,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            quiz_length: 5,
            quiz_retries: 2,
            quiz_retry_delay_ms: 1000,
            exam_length: 100,
            options_per_question: 4,
            max_tokens: 1024,
            placeholder_image_base: "https://placehold.co/600x400?text=".to_string(),
        }
    }
}

impl Config {
    /// Load `.env`, the optional TOML file named by `LINGO_CONFIG`, then the
    /// process environment on top.
    pub fn load() -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::File {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay variables produced by `lookup` onto this config.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |slot: &mut Option<String>, name: &str| {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        };

        set(&mut self.chat.api_url, "CHAT_API_URL");
        set(&mut self.chat.api_key, "CHAT_API_KEY");
        set(&mut self.chat.model, "CHAT_MODEL");
        set(&mut self.image.api_url, "IMAGE_API_URL");
        set(&mut self.image.api_key, "IMAGE_API_KEY");
        set(&mut self.image.model, "IMAGE_MODEL");
        set(&mut self.rerank.api_url, "RERANK_API_URL");
        set(&mut self.rerank.api_key, "RERANK_API_KEY");
        set(&mut self.rerank.model, "RERANK_MODEL");
        set(&mut self.speech.stt_url, "SPEECH_STT_URL");
        set(&mut self.speech.tts_url, "SPEECH_TTS_URL");
        set(&mut self.speech.api_key, "SPEECH_API_KEY");
        set(&mut self.kv.api_url, "KV_API_URL");
        set(&mut self.kv.api_key, "KV_API_KEY");

        if let Some(shape) = lookup("CHAT_RESPONSE_SHAPE") {
            self.chat.response_shape =
                shape
                    .parse()
                    .map_err(|_| ConfigurationError::InvalidValue {
                        variable: "CHAT_RESPONSE_SHAPE".to_string(),
                        value: shape.clone(),
                    })?;
        }
        if let Some(shape) = lookup("IMAGE_RESPONSE_SHAPE") {
            self.image.response_shape =
                shape
                    .parse()
                    .map_err(|_| ConfigurationError::InvalidValue {
                        variable: "IMAGE_RESPONSE_SHAPE".to_string(),
                        value: shape.clone(),
                    })?;
        }

        Ok(())
    }

    /// Report every missing variable the chat flows need, then check that each
    /// configured URL parses.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("CHAT_API_URL", &self.chat.api_url),
            ("CHAT_API_KEY", &self.chat.api_key),
            ("CHAT_MODEL", &self.chat.model),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingVariables(missing));
        }

        let urls = [
            ("CHAT_API_URL", &self.chat.api_url),
            ("IMAGE_API_URL", &self.image.api_url),
            ("RERANK_API_URL", &self.rerank.api_url),
            ("SPEECH_STT_URL", &self.speech.stt_url),
            ("SPEECH_TTS_URL", &self.speech.tts_url),
            ("KV_API_URL", &self.kv.api_url),
        ];
        for (name, value) in urls {
            if let Some(raw) = value {
                Url::parse(raw).map_err(|e| ConfigurationError::InvalidUrl {
                    variable: name.to_string(),
                    reason: e.to_string(),
                })?;
            }
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// `provider` also names the variables: `rerank` reads `RERANK_API_URL`.
    pub fn credentials(&self, provider: &'static str) -> Result<Credentials, ConfigurationError> {
        let prefix = provider.to_uppercase();
        resolve(
            provider,
            (&format!("{}_API_URL", prefix), &self.api_url),
            (&format!("{}_API_KEY", prefix), &self.api_key),
            self.model.clone(),
        )
    }
}

impl ImageProviderConfig {
    pub fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        resolve(
            "image",
            ("IMAGE_API_URL", &self.api_url),
            ("IMAGE_API_KEY", &self.api_key),
            self.model.clone(),
        )
    }
}

impl SpeechConfig {
    pub fn stt_credentials(&self) -> Result<Credentials, ConfigurationError> {
        resolve(
            "speech-to-text",
            ("SPEECH_STT_URL", &self.stt_url),
            ("SPEECH_API_KEY", &self.api_key),
            None,
        )
    }

    pub fn tts_credentials(&self) -> Result<Credentials, ConfigurationError> {
        resolve(
            "text-to-speech",
            ("SPEECH_TTS_URL", &self.tts_url),
            ("SPEECH_API_KEY", &self.api_key),
            None,
        )
    }
}

impl KvConfig {
    pub fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        resolve(
            "kv",
            ("KV_API_URL", &self.api_url),
            ("KV_API_KEY", &self.api_key),
            None,
        )
    }
}

fn resolve(
    provider: &'static str,
    (url_var, api_url): (&str, &Option<String>),
    (key_var, api_key): (&str, &Option<String>),
    model: Option<String>,
) -> Result<Credentials, ConfigurationError> {
    let missing = |variable: &str| ConfigurationError::MissingCredential {
        provider,
        variable: variable.to_string(),
    };
    let api_url = api_url.clone().ok_or_else(|| missing(url_var))?;
    let api_key = api_key.clone().ok_or_else(|| missing(key_var))?;
    Ok(Credentials {
        api_url,
        api_key,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_flow_contract() {
        let config = Config::default();
        assert_eq!(config.flow.quiz_length, 5);
        assert_eq!(config.flow.quiz_retries, 2);
        assert_eq!(config.flow.exam_length, 100);
        assert_eq!(config.flow.options_per_question, 4);
        assert_eq!(config.speech.sample_rate, 24_000);
    }

    #[test]
    fn validate_lists_every_missing_chat_variable() {
        let config = Config::default();
        match config.validate() {
            Err(ConfigurationError::MissingVariables(missing)) => {
                assert_eq!(missing, vec!["CHAT_API_URL", "CHAT_API_KEY", "CHAT_MODEL"]);
            }
            other => panic!("expected missing variables, got {:?}", other),
        }
    }

    #[test]
    fn env_overlays_toml() {
        let mut config = Config::from_toml_str(
            r#"
            [chat]
            api_url = "https://chat.example.com/v1/chat/completions"
            api_key = "from-file"
            model = "file-model"

            [flow]
            quiz_length = 7
            "#,
        )
        .unwrap();

        config
            .apply_env(lookup(&[
                ("CHAT_API_KEY", "from-env"),
                ("CHAT_RESPONSE_SHAPE", "result_response"),
            ]))
            .unwrap();

        assert_eq!(config.chat.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.chat.model.as_deref(), Some("file-model"));
        assert_eq!(config.chat.response_shape, ResponseShape::ResultResponse);
        assert_eq!(config.flow.quiz_length, 7);
        assert_eq!(config.flow.exam_length, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(lookup(&[("IMAGE_API_KEY", "  ")])).unwrap();
        assert!(config.image.api_key.is_none());
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup(&[("CHAT_RESPONSE_SHAPE", "telepathy")]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn invalid_url_is_reported() {
        let mut config = Config::default();
        config
            .apply_env(lookup(&[
                ("CHAT_API_URL", "https://chat.example.com"),
                ("CHAT_API_KEY", "k"),
                ("CHAT_MODEL", "m"),
                ("KV_API_URL", "not a url"),
            ]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidUrl { ref variable, .. } if variable == "KV_API_URL"));
    }

    #[test]
    fn credentials_fail_lazily() {
        let config = Config::default();
        let err = config.image.credentials().unwrap_err();
        assert_eq!(err.to_string(), "Missing credential for image: set IMAGE_API_URL");

        let mut config = Config::default();
        config.rerank.api_url = Some("https://rerank.example.com".into());
        config.rerank.api_key = Some("secret".into());
        let creds = config.rerank.credentials("rerank").unwrap();
        assert_eq!(creds.api_key, "secret");
        assert!(creds.model.is_none());
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let mut config = Config::default();
        config.rerank.api_url = Some("https://rerank.example.com".into());
        match config.rerank.credentials("rerank") {
            Err(ConfigurationError::MissingCredential { provider, variable }) => {
                assert_eq!(provider, "rerank");
                assert_eq!(variable, "RERANK_API_KEY");
            }
            other => panic!("expected missing credential, got {:?}", other),
        }

        config.speech.stt_url = Some("https://stt.example.com".into());
        let err = config.speech.tts_credentials().unwrap_err();
        assert!(err.to_string().ends_with("set SPEECH_TTS_URL"), "{}", err);
    }
}
