use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use rl_core::{Error, GenerationRequest, Result, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ensure_success;
use crate::schema::parse_json_content;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Gemini's OpenAI-compatible endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

const SYSTEM_PROMPT: &str = "Respond only with a JSON value that matches the requested schema.";

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Any chat-completions API speaking the OpenAI wire format.
pub struct OpenAiModel {
    client: Arc<Client>,
    label: String,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl OpenAiModel {
    pub fn new(
        label: impl Into<String>,
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: Option<String>,
        client: Client,
    ) -> Result<Self> {
        let label = label.into();
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let Some(api_key) = api_key else {
            return Err(Error::External(anyhow!("{} API key is required", label)));
        };
        Ok(Self {
            client: Arc::new(client),
            label,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("label", &self.label)
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for OpenAiModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let body = ChatRequest {
            model: self.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: request.name.clone(),
                    schema: request.schema.clone(),
                },
            },
        };

        debug!("POST {}/chat/completions ({})", self.base_url, request.name);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(&self.label, response).await?;
        let reply = response.json::<ChatResponse>().await?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::generation(format!("{} returned no content", self.label)))?;
        parse_json_content(&content)
    }
}
