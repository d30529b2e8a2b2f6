//! # Lingo flows
//!
//! Server-side AI flows for an English tutor aimed at Arabic speakers.
//!
//! Every flow runs the same linear pipeline:
//!
//! ```text
//! Build prompt → Invoke hosted model → Extract JSON → Validate/Coerce → (Succeed | Fallback)
//! ```
//!
//! - `pipeline`: prompt builder, tolerant extractor, coercion and fallbacks
//! - `llm`: hosted chat, image, rerank and speech clients
//! - `flows`: quiz, exam, image, lesson, conversation, retrieval and speech flows
//! - `cache`: key/value pass-through cache for generated content
//! - `state`: client preference state behind a persistence port
//! - `commands`: JSON boundary consumed by the UI

pub mod cache;
pub mod commands;
pub mod config;
pub mod flows;
pub mod level;
pub mod llm;
pub mod pipeline;
pub mod state;
pub mod telemetry;

pub use commands::{FlowRequest, Flows};
pub use config::{Config, ConfigurationError};
pub use flows::FlowError;
pub use level::Level;
pub use llm::UpstreamError;
