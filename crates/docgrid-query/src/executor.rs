//! Concurrency-bounded query execution.
//!
//! Every attempt holds a limiter permit and a registered task for exactly the
//! duration of its search and completion calls. Failed attempts back off
//! without holding a permit. Whatever happens, callers get a typed result.

use std::sync::Arc;
use std::time::Duration;

use docgrid_core::{ConcurrencyLimiter, Error, QuerySettings, Result, TaskRegistry};
use docgrid_llm::{CompletionService, TaskContext};
use docgrid_store::{RetrievedChunk, VectorStore};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::entity::EntityResolver;
use crate::normalize::normalize;
use crate::prompts;
use crate::retry::RetryPolicy;
use crate::router::route;
use crate::types::{
    AnswerValue, EntitySource, QueryKind, QueryRequest, QueryResult, ResolvedEntity,
};

pub struct QueryExecutor {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn CompletionService>,
    limiter: ConcurrencyLimiter,
    registry: Arc<TaskRegistry>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn CompletionService>,
        limiter: ConcurrencyLimiter,
        registry: Arc<TaskRegistry>,
        settings: &QuerySettings,
    ) -> Self {
        Self {
            store,
            llm,
            limiter,
            registry,
            retry: RetryPolicy::from_settings(settings),
            timeout: settings.request_timeout(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Search, then ask the model.
    async fn search_and_generate(
        &self,
        request: &QueryRequest,
        kind: QueryKind,
        task: &TaskContext,
    ) -> Result<(Option<Value>, Vec<RetrievedChunk>)> {
        let prompt = &request.prompt;
        let doc = request.document_id.as_str();

        let chunks = match kind {
            QueryKind::Inference => Vec::new(),
            QueryKind::SimpleVector => {
                self.store
                    .vector_search(std::slice::from_ref(&prompt.query), doc)
                    .await?
                    .chunks
            }
            QueryKind::Hybrid => {
                self.store
                    .hybrid_search(&prompt.query, doc, &prompt.rules)
                    .await?
                    .chunks
            }
            QueryKind::Decomposition => self.decomposed_chunks(request).await?,
        };

        let text = match kind {
            QueryKind::Inference => {
                prompts::inference_prompt(&prompt.query, &prompt.rules, prompt.answer_type)
            }
            _ => {
                let context = chunks
                    .iter()
                    .map(|c| c.content.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                prompts::retrieval_prompt(&prompt.query, &context, &prompt.rules, prompt.answer_type)
            }
        };
        let shape = prompts::response_shape(prompt.answer_type);

        let value = self
            .llm
            .generate_completion(&text, &shape, self.timeout, task)
            .await?;
        Ok((value, chunks))
    }

    /// Retrieval for decomposition queries. The model splits the question; when
    /// it cannot (error, or a single sub-query) the store's own splitting applies.
    async fn decomposed_chunks(&self, request: &QueryRequest) -> Result<Vec<RetrievedChunk>> {
        let prompt = &request.prompt;
        let doc = request.document_id.as_str();

        let sub_queries = match self.llm.decompose_query(&prompt.query).await {
            Ok(subs) => subs,
            Err(e) => {
                warn!("Decomposing {} failed, searching the whole query: {}", prompt.id, e);
                Vec::new()
            }
        };

        if sub_queries.len() > 1 {
            debug!("{} decomposed into {} sub-queries", prompt.id, sub_queries.len());
            return Ok(self.store.vector_search(&sub_queries, doc).await?.chunks);
        }
        let found = self
            .store
            .decomposed_search(&prompt.query, doc, &prompt.rules)
            .await?;
        debug!("{} split by the store into {} sub-queries", prompt.id, found.sub_queries.len());
        Ok(found.chunks)
    }

    /// One attempt: permit, registered task, timeout and cancellation.
    async fn attempt(
        &self,
        request: &QueryRequest,
        kind: QueryKind,
    ) -> Result<(Option<Value>, Vec<RetrievedChunk>)> {
        let _permit = self.limiter.acquire().await?;

        let tracked = self.registry.track();
        let task_id = tracked.id.clone();
        let token = tracked.token.clone();
        let task = TaskContext::new(task_id.clone(), token.clone());
        debug!("{} started for prompt {}", task_id, request.prompt.id);

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled(task_id)),
            outcome = tokio::time::timeout(self.timeout, self.search_and_generate(request, kind, &task)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(format!(
                        "{} exceeded {:?}",
                        task_id, self.timeout
                    ))),
                }
            }
        }
    }

    /// Run one query with retries. Never fails: exhaustion or cancellation
    /// yields the typed fallback.
    pub async fn run_query(&self, request: &QueryRequest) -> QueryResult {
        let kind = route(request);
        let attempts = self.retry.max_attempts();

        for attempt in 0..attempts {
            match self.attempt(request, kind).await {
                Ok((value, chunks)) => return self.finish(request, kind, value, chunks),
                Err(Error::Cancelled(id)) => {
                    info!("Query {} cancelled ({}), using fallback", request.prompt.id, id);
                    return QueryResult::fallback(request);
                }
                Err(e) if !e.is_retryable() => {
                    error!("Query {} failed permanently: {}", request.prompt.id, e);
                    return QueryResult::fallback(request);
                }
                Err(e) => {
                    if attempt + 1 >= attempts {
                        error!(
                            "Query {} failed after {} attempts: {}",
                            request.prompt.id, attempts, e
                        );
                        break;
                    }
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Query {} attempt {}/{} failed: {}. Retrying in {:?}",
                        request.prompt.id,
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        QueryResult::fallback(request)
    }

    fn finish(
        &self,
        request: &QueryRequest,
        kind: QueryKind,
        value: Option<Value>,
        chunks: Vec<RetrievedChunk>,
    ) -> QueryResult {
        let prompt = &request.prompt;
        let mut answer = normalize(value.as_ref().unwrap_or(&Value::Null), prompt.answer_type);

        let chunks = if answer.is_not_found() && kind != QueryKind::Decomposition {
            Vec::new()
        } else {
            chunks
        };

        let mut resolved_entities = None;
        if prompt.answer_type.is_textual() && !answer.is_empty() {
            let resolver = EntityResolver::from_rules(&prompt.rules);
            if !resolver.is_empty() {
                let (resolved, transformation) = resolver.resolve(&answer);
                if transformation.changed() {
                    debug!("Resolved entities in answer to {}", prompt.id);
                    resolved_entities = Some(vec![ResolvedEntity {
                        original: transformation.original,
                        resolved: transformation.resolved,
                        source: EntitySource {
                            source_type: "column".into(),
                            id: prompt.id.clone(),
                        },
                        entity_type: prompt.entity_type.clone(),
                    }]);
                }
                answer = resolved;
            }
        }

        let mut result = QueryResult::new(request, answer, chunks);
        result.resolved_entities = resolved_entities;
        result
    }

    /// [`run_query`](Self::run_query) on its own task, so a panic only costs
    /// this query its answer.
    pub async fn run_isolated(self: &Arc<Self>, request: QueryRequest) -> QueryResult {
        let fallback = QueryResult::fallback(&request);
        let this = Arc::clone(self);
        match tokio::spawn(async move { this.run_query(&request).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!("Query task for {} failed: {}", fallback.prompt_id, e);
                fallback
            }
        }
    }

    /// Run many queries. Inference and simple-vector queries go first; results
    /// come back in input order, with a fallback in any slot whose task died.
    pub async fn run_batch(self: &Arc<Self>, requests: Vec<QueryRequest>) -> Vec<QueryResult> {
        let requests = Arc::new(requests);
        let mut slots: Vec<Option<QueryResult>> = vec![None; requests.len()];

        let (priority, rest): (Vec<usize>, Vec<usize>) =
            (0..requests.len()).partition(|&i| route(&requests[i]).is_priority());
        info!(
            "Running batch of {} queries ({} priority)",
            requests.len(),
            priority.len()
        );

        for group in [priority, rest] {
            let mut set = JoinSet::new();
            for index in group {
                let this = Arc::clone(self);
                let requests = Arc::clone(&requests);
                set.spawn(async move { (index, this.run_query(&requests[index]).await) });
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((index, result)) => slots[index] = Some(result),
                    Err(e) => error!("Query task failed: {}", e),
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| QueryResult::fallback(&requests[i])))
            .collect()
    }
}
