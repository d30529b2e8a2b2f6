use super::{ensure_success, http_client, stream, ChatMessage, ChatRequest, ChunkReceiver, UpstreamError};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

const PROVIDER: &str = "chat";

/// Where the generated text lives in a chat completion body.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `choices[0].message.content`; stream deltas in `choices[0].delta.content`.
    #[default]
    Choices,
    /// `result.response`; stream deltas in `response`.
    ResultResponse,
}

impl FromStr for ResponseShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "choices" => Ok(ResponseShape::Choices),
            "result_response" | "result.response" => Ok(ResponseShape::ResultResponse),
            other => Err(format!("unknown response shape: {}", other)),
        }
    }
}

impl ResponseShape {
    pub fn text<'a>(&self, body: &'a Value) -> Option<&'a str> {
        match self {
            ResponseShape::Choices => body["choices"][0]["message"]["content"].as_str(),
            ResponseShape::ResultResponse => body["result"]["response"].as_str(),
        }
    }

    pub fn delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
        match self {
            ResponseShape::Choices => event["choices"][0]["delta"]["content"]
                .as_str()
                .or_else(|| event["choices"][0]["message"]["content"].as_str()),
            ResponseShape::ResultResponse => event["response"].as_str(),
        }
    }

    fn field(&self) -> &'static str {
        match self {
            ResponseShape::Choices => "choices[0].message.content",
            ResponseShape::ResultResponse => "result.response",
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError>;

    /// Stream the reply as text chunks. The default sends the whole completion
    /// as a single chunk.
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver, UpstreamError> {
        let text = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// Chat completion endpoint reached with a bearer token.
#[derive(Clone)]
pub struct HostedChatClient {
    client: Client,
    credentials: Credentials,
    shape: ResponseShape,
}

impl HostedChatClient {
    pub fn new(credentials: Credentials, shape: ResponseShape) -> Self {
        Self {
            client: http_client(),
            credentials,
            shape,
        }
    }

    fn wire<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> WireRequest<'a> {
        let model = request
            .model
            .as_deref()
            .or(self.credentials.model.as_deref())
            .unwrap_or("");
        WireRequest {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .client
            .post(&self.credentials.api_url)
            .bearer_auth(&self.credentials.api_key)
            .json(&self.wire(request, stream))
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                provider: PROVIDER,
                source,
            })?;

        ensure_success(PROVIDER, response).await
    }
}

#[async_trait]
impl ChatModel for HostedChatClient {
    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        let response = self.send(request, false).await?;
        let body: Value = response.json().await.map_err(|e| UpstreamError::Decode {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;

        let text = self.shape.text(&body).ok_or(UpstreamError::MissingField {
            provider: PROVIDER,
            field: self.shape.field(),
        })?;

        debug!(response_len = text.len(), "Chat completion received");
        Ok(text.to_string())
    }

    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver, UpstreamError> {
        let response = self.send(request, true).await?;
        Ok(stream::spawn_sse_reader(PROVIDER, response, self.shape))
    }
}
