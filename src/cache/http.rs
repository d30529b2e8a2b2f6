use super::{CacheError, KvStore};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Managed KV namespace reached over REST:
/// `GET {base}/values/{key}` and `PUT {base}/values/{key}?expiration_ttl=N`.
#[derive(Clone)]
pub struct HttpKv {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpKv {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: crate::llm::http_client(),
            base_url: credentials.api_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key,
        }
    }

    fn value_url(&self, key: &str) -> String {
        format!("{}/values/{}", self.base_url, urlencoding::encode(key))
    }
}

#[async_trait]
impl KvStore for HttpKv {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let response = self
            .client
            .get(self.value_url(key))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("KV miss");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "KV read failed");
                Err(CacheError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let response = self
            .client
            .put(self.value_url(key))
            .query(&[("expiration_ttl", ttl.as_secs())])
            .bearer_auth(&self.api_key)
            .body(value.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "KV write failed");
        Err(CacheError::Http {
            status: status.as_u16(),
            body,
        })
    }
}
