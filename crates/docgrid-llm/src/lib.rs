//! DocGrid LLM: collaborator traits and an OpenAI-compatible client.
//!
//! The query engine and the model-assisted extraction backend talk to language
//! models only through [`CompletionService`] and [`VisionModel`].

pub mod config;
pub mod providers;
pub mod service;
pub mod types;

pub use config::LLMConfig;
pub use providers::OpenAiCompatClient;
pub use service::{CompletionService, VisionModel};
pub use types::*;
