//! OpenAI-compatible chat completions client (OpenAI, Groq).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use docgrid_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::LLMConfig;
use crate::service::{CompletionService, VisionModel};
use crate::types::{ChatMessage, LLMProvider, ResponseShape, TaskContext};

const DECOMPOSE_TIMEOUT: Duration = Duration::from_secs(30);
const VISION_TIMEOUT: Duration = Duration::from_secs(120);

const DECOMPOSE_PROMPT: &str = "Break the following question into the smallest set of \
self-contained sub-questions that together answer it. If it is already atomic, return it unchanged.\n\nQuestion: ";

const VISION_PROMPT: &str = "Extract all visible text from this document image. \
Preserve reading order, headings and table rows. Return only the text.";

/// Client for any provider speaking the OpenAI chat completions format.
pub struct OpenAiCompatClient {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: String,
    temperature: f64,
}

impl OpenAiCompatClient {
    pub fn new(provider: LLMProvider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            provider,
            model: model.into(),
            api_key: api_key.into(),
            temperature: 0.0,
        }
    }

    /// Build from stored config. Missing credentials are a configuration error.
    pub fn from_config(config: &LLMConfig) -> Result<Self> {
        let (provider, model, key) = config.resolve_provider().ok_or_else(|| {
            Error::Config("no LLM provider configured (set OPENAI_API_KEY or GROQ_API_KEY)".into())
        })?;
        info!("Using LLM provider {} with model {}", provider, model);
        let mut client = Self::new(provider, model, key);
        client.temperature = config.temperature;
        Ok(client)
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One non-streaming chat call. Returns the first choice's content.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        response_format: Option<Value>,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(format) = response_format {
            body["response_format"] = format;
        }

        debug!("Requesting completion from {} with model {}", self.provider, self.model);

        let response = self
            .client
            .post(self.provider.chat_url())
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("API error {}: {}", status, body);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Error::Upstream(message)
            } else {
                Error::Http(message)
            });
        }

        let parsed: Value = response.json().await.map_err(request_error)?;
        Ok(parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string))
    }
}

fn request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Upstream(e.to_string())
    }
}

/// True when the value is an object whose fields are all null.
fn all_fields_null(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(Value::is_null),
        Value::Null => true,
        _ => false,
    }
}

/// Parse the model's JSON content into a usable response.
fn parse_structured(content: &str) -> Result<Option<Value>> {
    let value: Value = serde_json::from_str(content.trim())?;
    if all_fields_null(&value) {
        return Ok(None);
    }
    Ok(Some(value))
}

#[async_trait]
impl CompletionService for OpenAiCompatClient {
    async fn generate_completion(
        &self,
        prompt: &str,
        shape: &ResponseShape,
        timeout: Duration,
        task: &TaskContext,
    ) -> Result<Option<Value>> {
        let call = self.chat(
            vec![ChatMessage::user(prompt)],
            Some(shape.response_format()),
            timeout,
        );

        let content = tokio::select! {
            biased;
            _ = task.token.cancelled() => {
                return Err(Error::Cancelled(task.task_id.clone()));
            }
            result = call => result?,
        };

        let Some(content) = content else {
            warn!("Empty completion for task {}", task.task_id);
            return Ok(None);
        };

        let parsed = parse_structured(&content)?;
        if parsed.is_none() {
            info!("All fields in the response for task {} are null", task.task_id);
        }
        Ok(parsed)
    }

    async fn decompose_query(&self, query: &str) -> Result<Vec<String>> {
        let shape = ResponseShape::single_field(
            "sub_queries",
            "sub_queries",
            json!({"type": "array", "items": {"type": "string"}}),
        );
        let prompt = format!("{}{}", DECOMPOSE_PROMPT, query);
        let task = TaskContext::detached("decompose");

        let subs = match self
            .generate_completion(&prompt, &shape, DECOMPOSE_TIMEOUT, &task)
            .await
        {
            Ok(Some(value)) => sub_queries_from(&value),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Query decomposition failed, using the original query: {}", e);
                Vec::new()
            }
        };

        if subs.is_empty() {
            return Ok(vec![query.to_string()]);
        }
        Ok(subs)
    }
}

fn sub_queries_from(value: &Value) -> Vec<String> {
    value["sub_queries"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VisionModel for OpenAiCompatClient {
    async fn transcribe_image(
        &self,
        image: &[u8],
        mime: &str,
        task: &TaskContext,
    ) -> Result<Option<String>> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let message = ChatMessage {
            role: "user".into(),
            content: json!([
                {"type": "text", "text": VISION_PROMPT},
                {"type": "image_url", "image_url": {"url": format!("data:{};base64,{}", mime, encoded)}},
            ]),
        };

        debug!("Transcribing {} byte {} image as {}", image.len(), mime, task.task_id);
        let text = tokio::select! {
            biased;
            _ = task.token.cancelled() => {
                return Err(Error::Cancelled(task.task_id.clone()));
            }
            result = self.chat(vec![message], None, VISION_TIMEOUT) => result?,
        };
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured() {
        assert_eq!(
            parse_structured(r#"{"answer": 3}"#).unwrap(),
            Some(json!({"answer": 3}))
        );
        assert_eq!(parse_structured(r#"{"answer": null}"#).unwrap(), None);
        assert!(parse_structured("not json").is_err());
    }

    #[test]
    fn test_sub_queries_from() {
        let value = json!({"sub_queries": ["What is A?", "  ", "What is B?"]});
        assert_eq!(sub_queries_from(&value), vec!["What is A?", "What is B?"]);
        assert!(sub_queries_from(&json!({"other": 1})).is_empty());
    }

    #[test]
    fn test_from_config_without_keys() {
        let config = LLMConfig {
            preferred_provider: "openai".into(),
            ..LLMConfig::default()
        };
        assert!(matches!(
            OpenAiCompatClient::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_response() {
        let client = OpenAiCompatClient::new(LLMProvider::OpenAI, "gpt-4o", "sk-test");
        let task = TaskContext::detached("task_0");
        task.token.cancel();
        let shape = ResponseShape::single_field("a", "answer", json!({"type": "string"}));
        let result = client
            .generate_completion("hi", &shape, Duration::from_secs(5), &task)
            .await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
