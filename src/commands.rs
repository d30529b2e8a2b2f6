//! JSON boundary consumed by the UI.
//!
//! Each request names its flow in a `flow` field:
//!
//! ```json
//! { "flow": "quiz", "topic": "Greetings", "level": "beginner", "lesson_text": "..." }
//! ```
//!
//! [`Flows::dispatch`] answers with the serialised result or a readable error
//! string, which is what the UI shows in its toast.

use crate::cache::{cache_key, Generated, HttpKv, KvStore, MemoryKv, ResponseCache};
use crate::config::{Config, ConfigurationError, FlowConfig};
use crate::flows::{
    conversation, exam, image, lesson, quiz, retrieval, speech, ConversationRequest, ExamRequest,
    ExamSettings, FlowError, LessonRequest, QuizRequest, QuizSettings, StoryRequest,
};
use crate::llm::{
    ChatModel, ChunkReceiver, HostedChatClient, HostedImageClient, HostedReranker, HostedSpeechClient,
    ImageModel, Reranker, SpeechModel,
};
use crate::state::Persona;
use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Deserialize, Debug, Clone)]
pub struct ConversationCommand {
    #[serde(flatten)]
    pub request: ConversationRequest,
    #[serde(default)]
    pub persona: Option<Persona>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowRequest {
    Quiz(QuizRequest),
    Exam(ExamRequest),
    Image { prompt: String },
    Images { prompts: Vec<String> },
    Lesson(LessonRequest),
    Story(StoryRequest),
    Conversation(ConversationCommand),
    Rerank { query: String, documents: Vec<String> },
    /// `audio` is a base64 `data:` URI.
    Transcribe { audio: String },
    Speak { text: String },
}

impl FlowRequest {
    pub fn name(&self) -> &'static str {
        match self {
            FlowRequest::Quiz(_) => "quiz",
            FlowRequest::Exam(_) => "exam",
            FlowRequest::Image { .. } => "image",
            FlowRequest::Images { .. } => "images",
            FlowRequest::Lesson(_) => "lesson",
            FlowRequest::Story(_) => "story",
            FlowRequest::Conversation(_) => "conversation",
            FlowRequest::Rerank { .. } => "rerank",
            FlowRequest::Transcribe { .. } => "transcribe",
            FlowRequest::Speak { .. } => "speak",
        }
    }
}

fn missing(provider: &'static str, variable: &str) -> FlowError {
    FlowError::Configuration(ConfigurationError::MissingCredential {
        provider,
        variable: variable.to_string(),
    })
}

/// Providers and settings shared by every flow call. Only the chat model is
/// mandatory; flows whose provider is absent fail with a configuration error.
pub struct Flows {
    chat: Arc<dyn ChatModel>,
    image: Option<Arc<dyn ImageModel>>,
    reranker: Option<Arc<dyn Reranker>>,
    transcriber: Option<Arc<dyn SpeechModel>>,
    synthesizer: Option<Arc<dyn SpeechModel>>,
    cache: ResponseCache,
    persona: Persona,
    config: FlowConfig,
    sample_rate: u32,
}

impl Flows {
    pub fn new(chat: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self {
            chat,
            image: None,
            reranker: None,
            transcriber: None,
            synthesizer: None,
            cache: ResponseCache::new(Arc::new(MemoryKv::new(config.kv.memory_capacity))),
            persona: Persona::default(),
            config: config.flow.clone(),
            sample_rate: config.speech.sample_rate,
        }
    }

    /// Wire hosted clients for every configured provider. A provider counts
    /// as configured once its URL is set.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let chat = HostedChatClient::new(config.chat.credentials("chat")?, config.chat.response_shape);
        let mut flows = Self::new(Arc::new(chat), config);

        if config.image.api_url.is_some() {
            let client = HostedImageClient::new(config.image.credentials()?, config.image.response_shape);
            flows = flows.with_image_model(Arc::new(client));
        }
        if config.rerank.api_url.is_some() {
            let client = HostedReranker::new(config.rerank.credentials("rerank")?);
            flows = flows.with_reranker(Arc::new(client));
        }
        let stt = match config.speech.stt_url {
            Some(_) => Some(config.speech.stt_credentials()?),
            None => None,
        };
        let tts = match config.speech.tts_url {
            Some(_) => Some(config.speech.tts_credentials()?),
            None => None,
        };
        let client = HostedSpeechClient::new(stt, tts);
        let (transcribe, speak) = (client.can_transcribe(), client.can_synthesize());
        let speech: Arc<dyn SpeechModel> = Arc::new(client);
        if transcribe {
            flows.transcriber = Some(speech.clone());
        }
        if speak {
            flows.synthesizer = Some(speech);
        }
        if config.kv.api_url.is_some() {
            flows = flows.with_store(Arc::new(HttpKv::new(config.kv.credentials()?)));
        }

        info!(
            image = flows.image.is_some(),
            rerank = flows.reranker.is_some(),
            transcribe = flows.transcriber.is_some(),
            speak = flows.synthesizer.is_some(),
            "Flows configured"
        );
        Ok(flows)
    }

    pub fn with_image_model(mut self, model: Arc<dyn ImageModel>) -> Self {
        self.image = Some(model);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Use `model` for both speech directions.
    pub fn with_speech_model(mut self, model: Arc<dyn SpeechModel>) -> Self {
        self.transcriber = Some(model.clone());
        self.synthesizer = Some(model);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.cache = ResponseCache::new(store);
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    fn image_model(&self) -> Result<&dyn ImageModel, FlowError> {
        self.image.as_deref().ok_or_else(|| missing("image", "IMAGE_API_URL"))
    }

    fn transcriber(&self) -> Result<&dyn SpeechModel, FlowError> {
        self.transcriber
            .as_deref()
            .ok_or_else(|| missing("speech-to-text", "SPEECH_STT_URL"))
    }

    fn synthesizer(&self) -> Result<&dyn SpeechModel, FlowError> {
        self.synthesizer
            .as_deref()
            .ok_or_else(|| missing("text-to-speech", "SPEECH_TTS_URL"))
    }

    /// Parse `json`, run the flow it names and serialise the result.
    pub async fn dispatch(&self, json: &str) -> Result<String, String> {
        self.dispatch_inner(json).await.map_err(|e| format!("{:#}", e))
    }

    async fn dispatch_inner(&self, json: &str) -> anyhow::Result<String> {
        let request: FlowRequest = serde_json::from_str(json).context("Invalid flow request")?;
        let flow = request.name();
        let value = self
            .run(request)
            .await
            .with_context(|| format!("{} flow failed", flow))?;
        Ok(serde_json::to_string(&value)?)
    }

    #[instrument(skip_all, fields(flow = request.name()))]
    pub async fn run(&self, request: FlowRequest) -> Result<Value, FlowError> {
        let chat = self.chat.as_ref();
        let max_tokens = self.config.max_tokens;

        let value = match request {
            FlowRequest::Quiz(request) => {
                let settings = QuizSettings::from(&self.config);
                let outcome = quiz::generate_quiz(chat, &request, &settings).await;
                json!({ "questions": outcome.value, "fallback": outcome.is_fallback() })
            }
            FlowRequest::Exam(request) => {
                let settings = ExamSettings::from(&self.config);
                let outcome = exam::generate_exam(chat, &request, &settings).await;
                json!({ "questions": outcome.value, "fallback": outcome.is_fallback() })
            }
            FlowRequest::Image { prompt } => {
                let model = self.image_model()?;
                let base = &self.config.placeholder_image_base;
                let result = self
                    .cache
                    .get_or_generate(&cache_key("image", &prompt), || async {
                        let result = image::generate_image(model, &prompt, base).await;
                        let cacheable = !result.placeholder;
                        Generated {
                            value: result,
                            cacheable,
                        }
                    })
                    .await;
                serde_json::to_value(result)?
            }
            FlowRequest::Images { prompts } => {
                let model = self.image_model()?;
                let results =
                    image::generate_images(model, &prompts, &self.config.placeholder_image_base).await;
                json!({ "images": results })
            }
            FlowRequest::Lesson(request) => {
                let explanation = self
                    .cache
                    .get_or_generate(&cache_key("lesson", &request), || async {
                        Generated::from(lesson::explain_lesson(chat, &request, max_tokens).await)
                    })
                    .await;
                serde_json::to_value(explanation)?
            }
            FlowRequest::Story(request) => {
                let story = self
                    .cache
                    .get_or_generate(&cache_key("story", &request), || async {
                        Generated::from(lesson::generate_story(chat, &request, max_tokens).await)
                    })
                    .await;
                serde_json::to_value(story)?
            }
            FlowRequest::Conversation(command) => {
                let persona = command.persona.as_ref().unwrap_or(&self.persona);
                let outcome = conversation::reply(chat, persona, &command.request, max_tokens).await?;
                json!({ "reply": outcome.value })
            }
            FlowRequest::Rerank { query, documents } => {
                let reranker = self
                    .reranker
                    .as_deref()
                    .ok_or_else(|| missing("rerank", "RERANK_API_URL"))?;
                let context = retrieval::best_context(reranker, &query, &documents).await;
                json!({ "context": context })
            }
            FlowRequest::Transcribe { audio } => {
                let text = speech::transcribe_data_uri(self.transcriber()?, &audio).await?;
                json!({ "text": text })
            }
            FlowRequest::Speak { text } => {
                let audio = speech::speak(self.synthesizer()?, &text, self.sample_rate).await?;
                json!({ "audio": audio })
            }
        };
        Ok(value)
    }

    /// Streaming variant of the conversation flow. Dropping the receiver
    /// cancels the upstream read.
    pub async fn stream_conversation(&self, command: &ConversationCommand) -> Result<ChunkReceiver, FlowError> {
        let persona = command.persona.as_ref().unwrap_or(&self.persona);
        conversation::reply_stream(self.chat.as_ref(), persona, &command.request, self.config.max_tokens).await
    }
}
