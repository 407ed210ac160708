//! In-memory [`VectorStore`] for tests and the command-line tool.
//!
//! Records live in a `HashMap` behind a `parking_lot::RwLock`. There are no
//! embeddings: similarity is lexical term overlap between query and chunk,
//! which is enough to rank the chunks of a single document.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use docgrid_core::{Chunk, Result, Rule, RuleType};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::types::*;
use crate::VectorStore;

/// Maximum chunks returned by one search.
pub const SEARCH_LIMIT: usize = 40;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());
static SUB_QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[?;]|\s+and\s+").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "be", "by", "do", "does", "for", "from", "how", "in", "is", "it",
    "of", "on", "or", "that", "the", "this", "to", "was", "were", "what", "which", "who", "with",
];

fn terms(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of query terms present in the text.
fn lexical_score(query_terms: &[String], text: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let words: HashSet<String> = terms(text).into_iter().collect();
    let matched = query_terms.iter().filter(|t| words.contains(*t)).count();
    matched as f64 / query_terms.len() as f64
}

fn keyword_hits(keywords: &[String], text: &str) -> usize {
    let lower = text.to_lowercase();
    keywords.iter().map(|k| lower.matches(k.as_str()).count()).sum()
}

fn split_sub_queries(query: &str) -> Vec<String> {
    let subs: Vec<String> = SUB_QUERY_RE
        .split(query)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if subs.is_empty() {
        vec![query.trim().to_string()]
    } else {
        subs
    }
}

fn to_retrieved(record: &PreparedRecord) -> RetrievedChunk {
    RetrievedChunk {
        content: record.text.clone(),
        page: record.page,
        chunk_number: record.chunk_number,
    }
}

/// Vector store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<String, Vec<PreparedRecord>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Score every record of a document, best first, ties in chunk order.
    fn rank<F>(&self, document_id: &str, score: F) -> Vec<RetrievedChunk>
    where
        F: Fn(&PreparedRecord) -> f64,
    {
        let docs = self.documents.read();
        let Some(records) = docs.get(document_id) else {
            return Vec::new();
        };

        let mut scored: Vec<(f64, &PreparedRecord)> =
            records.iter().map(|r| (score(r), r)).collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.chunk_number.cmp(&b.1.chunk_number))
        });

        scored
            .into_iter()
            .take(SEARCH_LIMIT)
            .map(|(_, r)| to_retrieved(r))
            .collect()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn prepare_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
    ) -> Result<Vec<PreparedRecord>> {
        Ok(chunks
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| PreparedRecord::from_chunk(document_id, c))
            .collect())
    }

    async fn upsert(&self, records: Vec<PreparedRecord>) -> Result<UpsertStatus> {
        let upserted = records.len();
        let mut docs = self.documents.write();
        for record in records {
            let entries = docs.entry(record.document_id.clone()).or_default();
            match entries
                .iter_mut()
                .find(|r| r.chunk_number == record.chunk_number)
            {
                Some(existing) => *existing = record,
                None => entries.push(record),
            }
        }
        for entries in docs.values_mut() {
            entries.sort_by_key(|r| r.chunk_number);
        }
        debug!("Upserted {} records", upserted);
        Ok(UpsertStatus { upserted })
    }

    async fn vector_search(&self, queries: &[String], document_id: &str) -> Result<SearchResponse> {
        let query_terms: Vec<Vec<String>> = queries.iter().map(|q| terms(q)).collect();
        let chunks = self.rank(document_id, |r| {
            query_terms
                .iter()
                .map(|t| lexical_score(t, &r.text))
                .fold(0.0, f64::max)
        });
        Ok(SearchResponse {
            chunks,
            keywords: None,
        })
    }

    async fn hybrid_search(
        &self,
        query: &str,
        document_id: &str,
        rules: &[Rule],
    ) -> Result<SearchResponse> {
        let query_terms = terms(query);
        let mut keywords = query_terms.clone();
        for rule in rules {
            if matches!(rule.rule_type, RuleType::MustReturn | RuleType::MayReturn) {
                keywords.extend(rule.options.iter().map(|o| o.trim().to_lowercase()));
            }
        }
        keywords.retain(|k| !k.is_empty());
        keywords.sort_unstable();
        keywords.dedup();

        let chunks = self.rank(document_id, |r| {
            lexical_score(&query_terms, &r.text) + 0.5 * keyword_hits(&keywords, &r.text) as f64
        });
        Ok(SearchResponse {
            chunks,
            keywords: Some(keywords),
        })
    }

    async fn decomposed_search(
        &self,
        query: &str,
        document_id: &str,
        _rules: &[Rule],
    ) -> Result<DecomposedSearch> {
        let sub_queries = split_sub_queries(query);
        let response = self.vector_search(&sub_queries, document_id).await?;
        Ok(DecomposedSearch {
            sub_queries,
            chunks: response.chunks,
        })
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<RetrievedChunk>> {
        Ok(self
            .documents
            .read()
            .get(document_id)
            .map(|records| records.iter().map(to_retrieved).collect())
            .unwrap_or_default())
    }

    async fn delete_document(&self, document_id: &str) -> Result<DeleteStatus> {
        let deleted = self
            .documents
            .write()
            .remove(document_id)
            .map(|r| r.len())
            .unwrap_or(0);
        Ok(DeleteStatus {
            document_id: document_id.to_string(),
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgrid_core::UnitMetadata;

    fn chunk(n: usize, page: usize, text: &str) -> Chunk {
        Chunk {
            chunk_number: n,
            page,
            text: text.into(),
            metadata: UnitMetadata::default(),
        }
    }

    async fn seeded() -> MemoryVectorStore {
        let store = MemoryVectorStore::new();
        let chunks = vec![
            chunk(0, 1, "The lease starts in January and runs for two years."),
            chunk(1, 1, "Monthly rent is 2,400 dollars payable in advance."),
            chunk(2, 2, "The tenant may keep one cat or one dog."),
            chunk(3, 2, "   "),
        ];
        let records = store.prepare_chunks("doc1", &chunks).await.unwrap();
        assert_eq!(records.len(), 3);
        store.upsert(records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_vector_search_ranks_matching_chunk_first() {
        let store = seeded().await;
        let response = store
            .vector_search(&["What is the monthly rent?".into()], "doc1")
            .await
            .unwrap();
        assert_eq!(response.chunks.len(), 3);
        assert!(response.chunks[0].content.contains("rent"));
    }

    #[tokio::test]
    async fn test_hybrid_search_uses_rule_options() {
        let store = seeded().await;
        let rules = vec![Rule::new(
            RuleType::MustReturn,
            vec!["cat".into(), "dog".into()],
        )];
        let response = store
            .hybrid_search("Which pets are allowed?", "doc1", &rules)
            .await
            .unwrap();
        assert!(response.chunks[0].content.contains("cat"));
        let keywords = response.keywords.unwrap();
        assert!(keywords.contains(&"cat".to_string()));
    }

    #[tokio::test]
    async fn test_hybrid_keywords_are_unique() {
        let store = seeded().await;
        let rules = vec![
            Rule::new(RuleType::MustReturn, vec!["dog".into(), " Cat ".into()]),
            Rule::new(RuleType::MayReturn, vec!["rent".into()]),
        ];
        let response = store
            .hybrid_search("Is a cat or dog allowed?", "doc1", &rules)
            .await
            .unwrap();
        let keywords = response.keywords.unwrap();
        assert_eq!(keywords, vec!["allowed", "cat", "dog", "rent"]);
        assert!(response.chunks[0].content.contains("cat"));
    }

    #[tokio::test]
    async fn test_decomposed_search_splits_query() {
        let store = seeded().await;
        let result = store
            .decomposed_search("When does the lease start and what is the rent?", "doc1", &[])
            .await
            .unwrap();
        assert_eq!(result.sub_queries.len(), 2);
        assert!(!result.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_chunk_number() {
        let store = seeded().await;
        let records = store
            .prepare_chunks("doc1", &[chunk(1, 1, "Rent was renegotiated.")])
            .await
            .unwrap();
        store.upsert(records).await.unwrap();

        let chunks = store.get_chunks("doc1").await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, "Rent was renegotiated.");
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = seeded().await;
        let status = store.delete_document("doc1").await.unwrap();
        assert_eq!(status.deleted, 3);
        assert!(store.get_chunks("doc1").await.unwrap().is_empty());
        assert_eq!(store.delete_document("doc1").await.unwrap().deleted, 0);
    }

    #[test]
    fn test_split_sub_queries() {
        assert_eq!(split_sub_queries("plain question"), vec!["plain question"]);
        assert_eq!(
            split_sub_queries("Who signed? When; and where"),
            vec!["Who signed", "When", "where"]
        );
    }
}
