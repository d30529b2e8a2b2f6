//! Pronunciation practice: speech to text and text to speech.

use super::FlowError;
use crate::llm::speech::wav_data_uri;
use crate::llm::{data_uri, SpeechModel};
use tracing::instrument;

#[instrument(skip_all, fields(bytes = audio.len()))]
pub async fn transcribe(model: &dyn SpeechModel, audio: &[u8]) -> Result<String, FlowError> {
    if audio.is_empty() {
        return Err(FlowError::InvalidInput("audio is empty".to_string()));
    }
    Ok(model.transcribe(audio).await?)
}

/// Accepts the `data:audio/...;base64,` URI the recorder hands over.
pub async fn transcribe_data_uri(model: &dyn SpeechModel, uri: &str) -> Result<String, FlowError> {
    let (_, audio) = data_uri::decode(uri)
        .ok_or_else(|| FlowError::InvalidInput("audio is not a base64 data URI".to_string()))?;
    transcribe(model, &audio).await
}

/// Synthesize `text` and wrap the PCM reply as a playable WAV data URI.
#[instrument(skip(model, text), fields(chars = text.chars().count()))]
pub async fn speak(model: &dyn SpeechModel, text: &str, sample_rate: u32) -> Result<String, FlowError> {
    if text.trim().is_empty() {
        return Err(FlowError::InvalidInput("nothing to speak".to_string()));
    }
    let audio = model.synthesize(text).await?;
    Ok(wav_data_uri(&audio, sample_rate))
}
