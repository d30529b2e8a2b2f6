//! Scripted model doubles for flow tests.

use crate::llm::{ChatModel, ChatRequest, ImageModel, RankedContext, Reranker, SpeechModel, UpstreamError};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::Barrier;

pub fn http_error(provider: &'static str, status: u16) -> UpstreamError {
    UpstreamError::Http {
        provider,
        status,
        status_text: "stubbed".to_string(),
        body: String::new(),
    }
}

/// Replies in order; `Err(status)` entries become HTTP errors. Once the script
/// runs out every call fails with a 500.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<&str, u16>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(http_error("chat", status)),
            None => Err(http_error("chat", 500)),
        }
    }
}

/// Fails for the listed prompts. With a barrier, every call waits until the
/// whole batch is in flight, so a sequential caller would never finish.
pub struct StubImages {
    failing: HashSet<String>,
    barrier: Option<Barrier>,
}

impl StubImages {
    pub fn failing(prompts: &[&str]) -> Self {
        Self {
            failing: prompts.iter().map(|p| p.to_string()).collect(),
            barrier: None,
        }
    }

    pub fn concurrent(batch: usize, failing: &[&str]) -> Self {
        Self {
            barrier: Some(Barrier::new(batch)),
            ..Self::failing(failing)
        }
    }
}

#[async_trait]
impl ImageModel for StubImages {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.failing.contains(prompt) {
            return Err(http_error("image", 500));
        }
        Ok(format!("data:image/png;base64,{}", prompt.len()))
    }
}

pub struct StubReranker {
    pub reply: Result<Vec<usize>, u16>,
}

#[async_trait]
impl Reranker for StubReranker {
    async fn rank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_k: usize,
    ) -> Result<Vec<RankedContext>, UpstreamError> {
        match &self.reply {
            Ok(ids) => Ok(ids
                .iter()
                .map(|&id| RankedContext { id, score: 1.0 })
                .collect()),
            Err(status) => Err(http_error("rerank", *status)),
        }
    }
}

/// Echoes: the transcript is the audio as UTF-8, the PCM is the text's bytes.
pub struct EchoSpeech;

#[async_trait]
impl SpeechModel for EchoSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, UpstreamError> {
        Ok(String::from_utf8_lossy(audio).into_owned())
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        Ok(text.as_bytes().to_vec())
    }
}
