//! Collaborator traits the pipeline and query engine call into.

use std::time::Duration;

use async_trait::async_trait;
use docgrid_core::Result;
use serde_json::Value;

use crate::types::{ResponseShape, TaskContext};

/// Structured completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Ask for a JSON object matching `shape`.
    ///
    /// `Ok(None)` means the model answered but produced nothing usable.
    /// Implementations must give up with `Error::Cancelled` once `task.token` fires.
    async fn generate_completion(
        &self,
        prompt: &str,
        shape: &ResponseShape,
        timeout: Duration,
        task: &TaskContext,
    ) -> Result<Option<Value>>;

    /// Split a question into independently answerable sub-questions.
    async fn decompose_query(&self, query: &str) -> Result<Vec<String>>;

    /// Cancel a call this service tracks on its own. Most services track nothing.
    fn cancel_task(&self, _task_id: &str) -> bool {
        false
    }

    fn cancel_all(&self) -> usize {
        0
    }
}

/// Image-to-text model used by model-assisted extraction.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Transcribe the text visible in an encoded image (`mime` e.g. `image/jpeg`).
    ///
    /// Same cancellation contract as [`CompletionService::generate_completion`].
    async fn transcribe_image(
        &self,
        image: &[u8],
        mime: &str,
        task: &TaskContext,
    ) -> Result<Option<String>>;
}
