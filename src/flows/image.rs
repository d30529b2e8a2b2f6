//! Lesson illustrations. Every prompt gets an image URL: a generated one when
//! the provider delivers, a placeholder otherwise.

use crate::llm::ImageModel;
use crate::pipeline::fallback::placeholder_image_url;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub prompt: String,
    pub image_url: String,
    pub placeholder: bool,
}

impl ImageResult {
    fn placeholder(prompt: &str, base: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            image_url: placeholder_image_url(base, prompt),
            placeholder: true,
        }
    }
}

#[instrument(skip(model, placeholder_base))]
pub async fn generate_image(model: &dyn ImageModel, prompt: &str, placeholder_base: &str) -> ImageResult {
    match model.generate(prompt).await {
        Ok(url) if !url.trim().is_empty() => ImageResult {
            prompt: prompt.to_string(),
            image_url: url,
            placeholder: false,
        },
        Ok(_) => {
            warn!("Image provider returned an empty image");
            ImageResult::placeholder(prompt, placeholder_base)
        }
        Err(e) => {
            warn!(error = %e, "Image generation failed, using placeholder");
            ImageResult::placeholder(prompt, placeholder_base)
        }
    }
}

/// Run every prompt concurrently. One result per prompt, in prompt order; a
/// failed item never affects its siblings.
pub async fn generate_images(
    model: &dyn ImageModel,
    prompts: &[String],
    placeholder_base: &str,
) -> Vec<ImageResult> {
    let tasks = prompts
        .iter()
        .map(|prompt| generate_image(model, prompt, placeholder_base));

    let results = join_all(tasks).await;

    let placeholders = results.iter().filter(|r| r.placeholder).count();
    info!(total = results.len(), placeholders, "Image batch finished");
    results
}
