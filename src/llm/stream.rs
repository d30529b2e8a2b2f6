//! Server-sent-event decoding for streamed chat completions.
//!
//! A reader task owns the HTTP body and pushes decoded text chunks onto a
//! bounded channel. Dropping the receiver cancels the task at its next send.

use super::{ResponseShape, UpstreamError};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

pub type ChunkReceiver = mpsc::Receiver<Result<String, UpstreamError>>;

pub const CHANNEL_CAPACITY: usize = 32;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental line splitter for `data:` events. Bytes are buffered until a
/// newline arrives so multi-byte characters split across reads survive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_line(line.trim_end_matches(|c| c == '\r' || c == '\n')) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).to_string();
        self.buffer.clear();
        parse_line(line.trim_end_matches('\r'))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_MARKER {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(payload.to_string()))
}

/// Pull the text delta out of one event payload.
pub fn decode_delta(payload: &str, shape: ResponseShape) -> Option<String> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Skipping non-JSON stream event");
            return None;
        }
    };
    shape
        .delta(&value)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub(crate) fn spawn_sse_reader(
    provider: &'static str,
    response: reqwest::Response,
    shape: ResponseShape,
) -> ChunkReceiver {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::default();

        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(source) => {
                    let _ = tx.send(Err(UpstreamError::Transport { provider, source })).await;
                    return;
                }
            };

            for event in decoder.push(&bytes) {
                match event {
                    SseEvent::Done => return,
                    SseEvent::Data(payload) => {
                        if let Some(text) = decode_delta(&payload, shape) {
                            if tx.send(Ok(text)).await.is_err() {
                                debug!(provider, "Stream consumer closed, stopping reader");
                                return;
                            }
                        }
                    }
                }
            }
        }

        if let Some(SseEvent::Data(payload)) = decoder.finish() {
            if let Some(text) = decode_delta(&payload, shape) {
                let _ = tx.send(Ok(text)).await;
            }
        }
    });

    rx
}
