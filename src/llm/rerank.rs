use super::{ensure_success, http_client, UpstreamError};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

const PROVIDER: &str = "rerank";

/// One ranked entry. `id` indexes the caller's document slice.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RankedContext {
    #[serde(alias = "index")]
    pub id: usize,
    #[serde(default, alias = "logit", alias = "relevance_score")]
    pub score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rank `documents` against `query`, best first, as the provider ordered them.
    async fn rank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedContext>, UpstreamError>;
}

#[derive(Serialize)]
struct Context<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    query: &'a str,
    contexts: Vec<Context<'a>>,
    top_k: usize,
}

#[derive(Clone)]
pub struct HostedReranker {
    client: Client,
    credentials: Credentials,
}

impl HostedReranker {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: http_client(),
            credentials,
        }
    }
}

/// Providers nest the ranking differently; accept the common placements.
fn ranking_array(body: &Value) -> Option<&Value> {
    if body.is_array() {
        return Some(body);
    }
    [
        &body["result"]["response"],
        &body["rankings"],
        &body["results"],
        &body["data"],
    ]
    .into_iter()
    .find(|candidate| candidate.is_array())
}

#[async_trait]
impl Reranker for HostedReranker {
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    async fn rank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedContext>, UpstreamError> {
        let body = WireRequest {
            model: self.credentials.model.as_deref(),
            query,
            contexts: documents.iter().map(|text| Context { text }).collect(),
            top_k,
        };

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

        let body: Value = response.json().await.map_err(|e| UpstreamError::Decode {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;
        let ranking = ranking_array(&body).ok_or(UpstreamError::MissingField {
            provider: PROVIDER,
            field: "result.response",
        })?;
        let ranked: Vec<RankedContext> =
            serde_json::from_value(ranking.clone()).map_err(|e| UpstreamError::Decode {
                provider: PROVIDER,
                reason: e.to_string(),
            })?;

        debug!(ranked = ranked.len(), "Rerank completed");
        Ok(ranked)
    }
}
