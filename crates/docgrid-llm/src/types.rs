//! Types shared between the query engine and language-model providers.

use docgrid_core::CancelToken;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Groq,
}

impl LLMProvider {
    /// Chat completions endpoint. Both speak the OpenAI wire format.
    pub fn chat_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1/chat/completions",
            LLMProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// Chat message sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Value,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: Value::String(content.into()),
        }
    }
}

/// JSON shape the model is asked to answer in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseShape {
    pub name: String,
    /// JSON schema of the expected object.
    pub schema: Value,
}

impl ResponseShape {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Object with a single required `field` of the given schema.
    pub fn single_field(name: impl Into<String>, field: &str, field_schema: Value) -> Self {
        Self::new(
            name,
            json!({
                "type": "object",
                "properties": { field: field_schema },
                "required": [field],
                "additionalProperties": false,
            }),
        )
    }

    /// `response_format` payload for OpenAI-compatible APIs.
    pub fn response_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "schema": self.schema,
                "strict": true,
            }
        })
    }
}

/// Identity and cancellation handle of one upstream call.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub token: CancelToken,
}

impl TaskContext {
    pub fn new(task_id: impl Into<String>, token: CancelToken) -> Self {
        Self {
            task_id: task_id.into(),
            token,
        }
    }

    /// Context for calls nobody will ever cancel.
    pub fn detached(task_id: impl Into<String>) -> Self {
        Self::new(task_id, CancelToken::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_field_shape() {
        let shape = ResponseShape::single_field("answer_int", "answer", json!({"type": "integer"}));
        assert_eq!(shape.schema["required"][0], "answer");
        assert_eq!(shape.schema["properties"]["answer"]["type"], "integer");

        let format = shape.response_format();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "answer_int");
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LLMProvider::Groq.to_string(), "groq");
        assert!(LLMProvider::OpenAI.chat_url().starts_with("https://api.openai.com"));
    }
}
