//! # Hosted model layer
//!
//! Thin HTTP clients for the hosted models the flows talk to. Each client
//! performs exactly one request per call and never retries, caches or rate
//! limits; that is left to the caller.
//!
//! ```text
//! ChatRequest ──► ChatModel::complete ──► text
//!             └─► ChatModel::stream   ──► mpsc::Receiver<chunk>
//! prompt      ──► ImageModel::generate ──► data URI
//! query+docs  ──► Reranker::rank       ──► ranked ids
//! audio/text  ──► SpeechModel          ──► transcript / PCM
//! ```

pub mod chat;
pub mod data_uri;
pub mod error;
pub mod image;
pub mod message;
pub mod rerank;
pub mod speech;
pub mod stream;

pub use chat::{ChatModel, HostedChatClient, ResponseShape};
pub use error::UpstreamError;
pub use image::{HostedImageClient, ImageModel, ImageShape};
pub use message::{ChatMessage, ChatRequest, Role};
pub use rerank::{HostedReranker, RankedContext, Reranker};
pub use speech::{HostedSpeechClient, SpeechModel};
pub use stream::ChunkReceiver;

use reqwest::{Client, Response};
use tracing::warn;

/// Shared client construction. Timeouts are left at the reqwest defaults.
pub(crate) fn http_client() -> Client {
    Client::new()
}

/// Turn a non-2xx response into [`UpstreamError::Http`], keeping the body for
/// diagnostics.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: Response,
) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_text = status.canonical_reason().unwrap_or("Unknown status").to_string();
    let body = response.text().await.unwrap_or_default();
    warn!(
        provider,
        status = status.as_u16(),
        body_len = body.len(),
        "Upstream returned an error status"
    );

    Err(UpstreamError::Http {
        provider,
        status: status.as_u16(),
        status_text,
        body,
    })
}
