use super::{data_uri, ensure_success, http_client, UpstreamError};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, instrument};

const PROVIDER: &str = "image";
const DEFAULT_MIME: &str = "image/png";

/// How an image endpoint returns its picture.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageShape {
    /// The body is the encoded image itself.
    #[default]
    RawBytes,
    /// A JSON body carrying base64 in `result.image`, `image` or `artifacts[0].base64`.
    JsonBase64,
}

impl FromStr for ImageShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw_bytes" | "raw" => Ok(ImageShape::RawBytes),
            "json_base64" | "json" => Ok(ImageShape::JsonBase64),
            other => Err(format!("unknown image shape: {}", other)),
        }
    }
}

#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate one picture and return it as a URL the UI can display.
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Clone)]
pub struct HostedImageClient {
    client: Client,
    credentials: Credentials,
    shape: ImageShape,
}

impl HostedImageClient {
    pub fn new(credentials: Credentials, shape: ImageShape) -> Self {
        Self {
            client: http_client(),
            credentials,
            shape,
        }
    }
}

fn base64_payload(body: &Value) -> Option<&str> {
    body["result"]["image"]
        .as_str()
        .or_else(|| body["image"].as_str())
        .or_else(|| body["artifacts"][0]["base64"].as_str())
}

#[async_trait]
impl ImageModel for HostedImageClient {
    #[instrument(skip(self))]
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let mut body = json!({ "prompt": prompt });
        if let Some(model) = &self.credentials.model {
            body["model"] = Value::String(model.clone());
        }

        let response = self
            .client
            .post(&self.credentials.api_url)
            .bearer_auth(&self.credentials.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                provider: PROVIDER,
                source,
            })?;
        let response = ensure_success(PROVIDER, response).await?;

        let url = match self.shape {
            ImageShape::RawBytes => {
                let mime = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| v.starts_with("image/"))
                    .unwrap_or(DEFAULT_MIME)
                    .to_string();
                let bytes = response.bytes().await.map_err(|source| UpstreamError::Transport {
                    provider: PROVIDER,
                    source,
                })?;
                if bytes.is_empty() {
                    return Err(UpstreamError::Decode {
                        provider: PROVIDER,
                        reason: "empty image body".to_string(),
                    });
                }
                data_uri::encode(&mime, &bytes)
            }
            ImageShape::JsonBase64 => {
                let body: Value = response.json().await.map_err(|e| UpstreamError::Decode {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;
                let payload = base64_payload(&body).ok_or(UpstreamError::MissingField {
                    provider: PROVIDER,
                    field: "result.image",
                })?;
                if payload.starts_with("data:") {
                    payload.to_string()
                } else {
                    data_uri::wrap_base64(DEFAULT_MIME, payload)
                }
            }
        };

        debug!(url_len = url.len(), "Image generated");
        Ok(url)
    }
}
