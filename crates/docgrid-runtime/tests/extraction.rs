mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docgrid_core::{Classification, DocGridConfig, Document, Result};
use docgrid_ingest::ALL_FAILED_TEXT;
use docgrid_llm::{CompletionService, ResponseShape, TaskContext, VisionModel};
use serde_json::Value;

use common::{grid_with, scanned_pdf};

struct NoLlm;

#[async_trait]
impl CompletionService for NoLlm {
    async fn generate_completion(
        &self,
        _prompt: &str,
        _shape: &ResponseShape,
        _timeout: Duration,
        _task: &TaskContext,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn decompose_query(&self, query: &str) -> Result<Vec<String>> {
        Ok(vec![query.to_string()])
    }
}

#[derive(Default)]
struct ReadingVision {
    calls: AtomicUsize,
}

#[async_trait]
impl VisionModel for ReadingVision {
    async fn transcribe_image(
        &self,
        _image: &[u8],
        mime: &str,
        task: &TaskContext,
    ) -> Result<Option<String>> {
        assert_eq!(mime, "image/jpeg");
        assert!(task.task_id.starts_with("task_"));
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!(
            "Invoice number {}, total due 42 dollars, payable to Acme Supply within thirty days.",
            n
        )))
    }
}

#[tokio::test]
async fn scanned_pdf_goes_through_model_assisted_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let vision = Arc::new(ReadingVision::default());
    let grid = grid_with(
        DocGridConfig::new(dir.path()).unwrap(),
        Arc::new(NoLlm),
        Some(vision.clone() as Arc<dyn VisionModel>),
    );
    let bytes = scanned_pdf(2);

    let preview = Document::new("preview", "scan.pdf", bytes.len(), None);
    let class = grid.pipeline().classify(&preview, Arc::new(bytes.clone())).await;
    assert_eq!(class, Classification::Scanned);

    let loaded = grid.pipeline().load(&preview, Arc::new(bytes.clone())).await;
    assert_eq!(loaded.method.as_deref(), Some("model_assisted"));
    assert_eq!(loaded.units.len(), 2);
    assert_eq!(vision.calls.load(Ordering::SeqCst), 2);
    assert_eq!(grid.status().active_tasks, 0);
    assert!(grid.status().peak_concurrency >= 1);

    // Same bytes again: served from the content cache, vision not consulted.
    let id = grid
        .upload_and_process("scan.pdf", bytes)
        .await
        .unwrap()
        .expect("document id");
    assert_eq!(vision.calls.load(Ordering::SeqCst), 2);

    let chunks = grid.get_chunks(&id).await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].page, 1);
    assert_eq!(chunks[1].page, 2);
    assert!(chunks.iter().all(|c| c.content.contains("total due 42")));
    assert_eq!(grid.status().cache_entries, 1);
}

#[tokio::test]
async fn unreadable_pdf_yields_one_error_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let config = DocGridConfig::new(dir.path()).unwrap();
    let uploads = config.data_paths.uploads.clone();
    let grid = grid_with(config, Arc::new(NoLlm), None);

    let id = grid
        .upload_and_process("broken.pdf", b"%PDF-1.4 this is not really a pdf".to_vec())
        .await
        .unwrap()
        .expect("document id");

    let chunks = grid.get_chunks(&id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, ALL_FAILED_TEXT);
    assert!(uploads.join(format!("{}.pdf", id)).is_file());
    // Failures are not cached.
    assert_eq!(grid.status().cache_entries, 0);
}
