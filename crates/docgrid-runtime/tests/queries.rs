mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docgrid_core::{DocGridConfig, Error, Result};
use docgrid_llm::{CompletionService, ResponseShape, TaskContext};
use docgrid_query::{AnswerType, AnswerValue, QueryPrompt, QueryRequest, NO_DOCUMENT_ID};
use docgrid_runtime::CancelTarget;
use serde_json::{json, Value};

use common::grid_with;

fn question(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|l| l.strip_prefix("Question: "))
        .unwrap_or_default()
        .to_string()
}

/// Echoes the question back after a short delay and records its own concurrency.
#[derive(Default)]
struct EchoLlm {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for EchoLlm {
    async fn generate_completion(
        &self,
        prompt: &str,
        _shape: &ResponseShape,
        _timeout: Duration,
        task: &TaskContext,
    ) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let q = question(prompt);
        let outcome = if q.starts_with("hang") {
            task.token.cancelled().await;
            Err(Error::Cancelled(task.task_id.clone()))
        } else {
            if q.starts_with("slow") && self.calls.load(Ordering::SeqCst) == 1 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            Ok(Some(json!({ "answer": q })))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn decompose_query(&self, query: &str) -> Result<Vec<String>> {
        Ok(vec![query.to_string()])
    }
}

fn config(dir: &std::path::Path) -> DocGridConfig {
    let mut config = DocGridConfig::new(dir).unwrap();
    config.query.initial_backoff_ms = 10;
    config.query.max_backoff_ms = 50;
    config
}

/// Runs `total` queries, the first `inference` of them without a document,
/// and checks ordering, typed answers and the concurrency bound.
async fn run_mixed_batch(total: usize, inference: usize, max_concurrency: usize) -> usize {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.query.max_concurrency = max_concurrency;
    let llm = Arc::new(EchoLlm::default());
    let grid = grid_with(config, llm.clone(), None);

    let doc = grid
        .upload_and_process(
            "report.txt",
            b"Quarterly report. Revenue rose in every region. Headcount stayed flat.".to_vec(),
        )
        .await
        .unwrap()
        .expect("document id");

    let expected = |i: usize| {
        if i < inference {
            format!("inference {}", i)
        } else {
            format!("revenue {}", i)
        }
    };
    let requests: Vec<QueryRequest> = (0..total)
        .map(|i| {
            let doc_id = if i < inference { NO_DOCUMENT_ID } else { doc.as_str() };
            QueryRequest::new(
                doc_id,
                QueryPrompt::new(format!("p{}", i), expected(i), AnswerType::Str),
            )
        })
        .collect();

    let results = grid.run_batch(requests).await;
    assert_eq!(results.len(), total);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.prompt_id, format!("p{}", i));
        assert_eq!(result.answer, AnswerValue::Str(expected(i)));
    }
    assert!(results[..inference].iter().all(|r| r.chunks.is_empty()));
    assert!(results[inference..].iter().all(|r| !r.chunks.is_empty()));

    let status = grid.status();
    assert_eq!(status.max_concurrency, max_concurrency);
    assert!(status.peak_concurrency <= max_concurrency);
    assert!(llm.peak.load(Ordering::SeqCst) <= max_concurrency);
    assert_eq!(llm.calls.load(Ordering::SeqCst), total);
    assert_eq!(status.active_tasks, 0);
    status.peak_concurrency
}

#[tokio::test]
async fn mixed_batch_is_ordered_and_bounded() {
    run_mixed_batch(12, 5, 10).await;
}

#[tokio::test]
async fn oversubscribed_batch_never_exceeds_the_limit() {
    let peak = run_mixed_batch(40, 15, 4).await;
    // Fifteen inference queries alone are enough to fill every slot.
    assert_eq!(peak, 4);
}

#[tokio::test]
async fn timeout_then_success_returns_typed_answer() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.query.request_timeout_secs = 1;
    let llm = Arc::new(EchoLlm::default());
    let grid = grid_with(config, llm.clone(), None);

    let request = QueryRequest::new(
        NO_DOCUMENT_ID,
        QueryPrompt::new("p", "slow question", AnswerType::Str),
    );
    let result = grid.run_query(&request).await;

    assert_eq!(result.answer, AnswerValue::Str("slow question".into()));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancelling_a_task_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(EchoLlm::default());
    let grid = Arc::new(grid_with(config(dir.path()), llm.clone(), None));

    // task_1 .. task_6
    for i in 0..6 {
        let request = QueryRequest::new(
            NO_DOCUMENT_ID,
            QueryPrompt::new(format!("p{}", i), format!("warmup {}", i), AnswerType::Int),
        );
        grid.run_query(&request).await;
    }

    let runner = grid.clone();
    let handle = tokio::spawn(async move {
        let request = QueryRequest::new(
            NO_DOCUMENT_ID,
            QueryPrompt::new("p7", "hang until cancelled", AnswerType::Int),
        );
        runner.run_query(&request).await
    });

    while !grid.executor().registry().contains("task_7") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(grid.cancel(CancelTarget::Task("task_7".into())), 1);
    assert_eq!(grid.cancel(CancelTarget::Task("task_7".into())), 0);

    let result = handle.await.unwrap();
    assert_eq!(result.answer, AnswerValue::Int(0));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 7);
    assert_eq!(grid.status().active_tasks, 0);
}
