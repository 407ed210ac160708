//! Query engine types.

use std::fmt;

use docgrid_core::Rule;
use docgrid_store::RetrievedChunk;
use serde::{Deserialize, Serialize};

/// Document id meaning "no document": the question is answered from its own text.
pub const NO_DOCUMENT_ID: &str = "00000000000000000000000000000000";

/// Supporting chunks returned with an answer.
pub const MAX_RESULT_CHUNKS: usize = 10;

/// Declared type of a prompt's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Int,
    Bool,
    Str,
    IntArray,
    StrArray,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Int => "int",
            AnswerType::Bool => "bool",
            AnswerType::Str => "str",
            AnswerType::IntArray => "int_array",
            AnswerType::StrArray => "str_array",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, AnswerType::IntArray | AnswerType::StrArray)
    }

    /// Whether entity resolution applies to answers of this type.
    pub fn is_textual(&self) -> bool {
        matches!(self, AnswerType::Str | AnswerType::StrArray)
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Int(i64),
    Bool(bool),
    Str(String),
    IntArray(Vec<i64>),
    StrArray(Vec<String>),
}

impl AnswerValue {
    /// Type-consistent answer used when nothing better is available.
    pub fn fallback(ty: AnswerType) -> Self {
        match ty {
            AnswerType::Int => AnswerValue::Int(0),
            AnswerType::Bool => AnswerValue::Bool(false),
            AnswerType::Str => AnswerValue::Str(String::new()),
            AnswerType::IntArray => AnswerValue::IntArray(Vec::new()),
            AnswerType::StrArray => AnswerValue::StrArray(Vec::new()),
        }
    }

    pub fn answer_type(&self) -> AnswerType {
        match self {
            AnswerValue::Int(_) => AnswerType::Int,
            AnswerValue::Bool(_) => AnswerType::Bool,
            AnswerValue::Str(_) => AnswerType::Str,
            AnswerValue::IntArray(_) => AnswerType::IntArray,
            AnswerValue::StrArray(_) => AnswerType::StrArray,
        }
    }

    /// The model's "not found" marker.
    pub fn is_not_found(&self) -> bool {
        match self {
            AnswerValue::Str(s) => s.trim().eq_ignore_ascii_case("not found"),
            _ => false,
        }
    }

    /// Empty string, empty list; numbers and bools are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Str(s) => s.is_empty(),
            AnswerValue::IntArray(v) => v.is_empty(),
            AnswerValue::StrArray(v) => v.is_empty(),
            _ => false,
        }
    }
}

/// Retrieval strategy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// No retrieval; the model answers from the question alone.
    Inference,
    /// Similarity search on the question.
    SimpleVector,
    /// Keyword + similarity search, boosted by rule options.
    Hybrid,
    /// Split into sub-questions, search each, merge.
    Decomposition,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Inference => "inference",
            QueryKind::SimpleVector => "simple_vector",
            QueryKind::Hybrid => "hybrid",
            QueryKind::Decomposition => "decomposition",
        }
    }

    /// Cheap kinds that a batch runs first.
    pub fn is_priority(&self) -> bool {
        matches!(self, QueryKind::Inference | QueryKind::SimpleVector)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column prompt: what to ask and how to shape the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPrompt {
    pub id: String,
    #[serde(default, alias = "entityType")]
    pub entity_type: String,
    pub query: String,
    #[serde(rename = "type")]
    pub answer_type: AnswerType,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Explicit strategy tag. Only `decomposition` is honoured as a tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<QueryKind>,
}

impl QueryPrompt {
    pub fn new(id: impl Into<String>, query: impl Into<String>, answer_type: AnswerType) -> Self {
        Self {
            id: id.into(),
            entity_type: String::new(),
            query: query.into(),
            answer_type,
            rules: Vec::new(),
            kind: None,
        }
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_kind(mut self, kind: QueryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub document_id: String,
    pub prompt: QueryPrompt,
}

impl QueryRequest {
    pub fn new(document_id: impl Into<String>, prompt: QueryPrompt) -> Self {
        Self {
            document_id: document_id.into(),
            prompt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub id: String,
}

/// A surfaced entity substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub original: AnswerValue,
    pub resolved: AnswerValue,
    pub source: EntitySource,
    #[serde(rename = "entityType")]
    pub entity_type: String,
}

/// Outcome of one query. Always well-typed, even after failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub document_id: String,
    pub prompt_id: String,
    pub answer_type: AnswerType,
    pub answer: AnswerValue,
    pub chunks: Vec<RetrievedChunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_entities: Option<Vec<ResolvedEntity>>,
}

impl QueryResult {
    pub fn new(request: &QueryRequest, answer: AnswerValue, mut chunks: Vec<RetrievedChunk>) -> Self {
        chunks.truncate(MAX_RESULT_CHUNKS);
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            document_id: request.document_id.clone(),
            prompt_id: request.prompt.id.clone(),
            answer_type: request.prompt.answer_type,
            answer,
            chunks,
            resolved_entities: None,
        }
    }

    /// Typed default answer with no chunks.
    pub fn fallback(request: &QueryRequest) -> Self {
        Self::new(
            request,
            AnswerValue::fallback(request.prompt.answer_type),
            Vec::new(),
        )
    }
}
