//! Speech-to-text and text-to-speech clients plus WAV framing for raw PCM.

use super::{data_uri, ensure_success, http_client, UpstreamError};
use crate::config::Credentials;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::{json, Value};
use tracing::{debug, instrument};

const STT: &str = "speech-to-text";
const TTS: &str = "text-to-speech";

pub const WAV_HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

#[async_trait]
pub trait SpeechModel: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, UpstreamError>;

    /// Returns raw little-endian 16-bit PCM.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// Either direction may be left out; calling it then fails with
/// [`UpstreamError::Unconfigured`].
#[derive(Clone)]
pub struct HostedSpeechClient {
    client: Client,
    stt: Option<Credentials>,
    tts: Option<Credentials>,
}

impl HostedSpeechClient {
    pub fn new(stt: Option<Credentials>, tts: Option<Credentials>) -> Self {
        Self {
            client: http_client(),
            stt,
            tts,
        }
    }

    pub fn can_transcribe(&self) -> bool {
        self.stt.is_some()
    }

    pub fn can_synthesize(&self) -> bool {
        self.tts.is_some()
    }
}

#[async_trait]
impl SpeechModel for HostedSpeechClient {
    #[instrument(skip(self, audio), fields(audio_len = audio.len()))]
    async fn transcribe(&self, audio: &[u8]) -> Result<String, UpstreamError> {
        let stt = self.stt.as_ref().ok_or(UpstreamError::Unconfigured { provider: STT })?;
        let response = self
            .client
            .post(&stt.api_url)
            .bearer_auth(&stt.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|source| UpstreamError::Transport { provider: STT, source })?;
        let response = ensure_success(STT, response).await?;

        let body: Value = response.json().await.map_err(|e| UpstreamError::Decode {
            provider: STT,
            reason: e.to_string(),
        })?;
        let text = body["text"]
            .as_str()
            .or_else(|| body["result"]["text"].as_str())
            .ok_or(UpstreamError::MissingField {
                provider: STT,
                field: "text",
            })?;

        debug!(transcript_len = text.len(), "Transcription received");
        Ok(text.trim().to_string())
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        let tts = self.tts.as_ref().ok_or(UpstreamError::Unconfigured { provider: TTS })?;
        let response = self
            .client
            .post(&tts.api_url)
            .bearer_auth(&tts.api_key)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|source| UpstreamError::Transport { provider: TTS, source })?;
        let response = ensure_success(TTS, response).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        if !is_json {
            let bytes = response
                .bytes()
                .await
                .map_err(|source| UpstreamError::Transport { provider: TTS, source })?;
            return Ok(bytes.to_vec());
        }

        let body: Value = response.json().await.map_err(|e| UpstreamError::Decode {
            provider: TTS,
            reason: e.to_string(),
        })?;
        let payload = body["audio"]
            .as_str()
            .or_else(|| body["result"]["audio"].as_str())
            .ok_or(UpstreamError::MissingField {
                provider: TTS,
                field: "audio",
            })?;

        match data_uri::decode(payload) {
            Some((_, bytes)) => Ok(bytes),
            None => STANDARD.decode(payload.trim()).map_err(|e| UpstreamError::Decode {
                provider: TTS,
                reason: e.to_string(),
            }),
        }
    }
}

/// Frame 16-bit PCM samples in a canonical 44-byte RIFF/WAVE header.
pub fn wav_from_pcm(pcm: &[u8], sample_rate: u32, channels: u16) -> Bytes {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = pcm.len() as u32;

    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + pcm.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");
    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1); // PCM
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(BITS_PER_SAMPLE);
    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);
    buf.freeze()
}

/// PCM that already starts with a RIFF header is passed through untouched.
pub fn wav_data_uri(audio: &[u8], sample_rate: u32) -> String {
    if audio.starts_with(b"RIFF") {
        return data_uri::encode("audio/wav", audio);
    }
    data_uri::encode("audio/wav", &wav_from_pcm(audio, sample_rate, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_describes_the_samples() {
        let pcm = vec![0u8; 480];
        let wav = wav_from_pcm(&pcm, 24_000, 1);

        assert_eq!(wav.len(), WAV_HEADER_LEN + 480);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 480);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 480);
    }

    #[test]
    fn existing_wav_is_not_reframed() {
        let wav = wav_from_pcm(&[1, 2, 3, 4], 16_000, 1);
        let uri = wav_data_uri(&wav, 24_000);
        let (mime, bytes) = data_uri::decode(&uri).unwrap();
        assert_eq!(mime, "audio/wav");
        assert_eq!(bytes, wav.to_vec());
    }
}
