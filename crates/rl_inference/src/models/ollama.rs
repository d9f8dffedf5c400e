use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use rl_core::{Error, GenerationRequest, Result, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::ensure_success;
use crate::schema::parse_json_content;

/// Host, port and model, with the model name carried in the path.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/gemma3:12b";
const DEFAULT_OLLAMA_PORT: u16 = 11434;
const DEFAULT_OLLAMA_MODEL: &str = "gemma3:12b";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    ollama_host: String,
    ollama_port: u16,
    model_name: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost".to_string(),
            ollama_port: DEFAULT_OLLAMA_PORT,
            model_name: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl OllamaConfig {
    /// Parse `http://host:port/model`; a missing port or model falls back to
    /// the defaults.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{} ({})", url, e)))?;
        let model_name = parsed.path().trim_start_matches('/').to_string();

        Ok(Self {
            ollama_host: format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or("localhost")),
            ollama_port: parsed.port().unwrap_or(DEFAULT_OLLAMA_PORT),
            model_name: if model_name.is_empty() {
                DEFAULT_OLLAMA_MODEL.to_string()
            } else {
                model_name
            },
        })
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn get_ollama_host(&self) -> &str {
        &self.ollama_host
    }

    pub fn get_ollama_port(&self) -> u16 {
        self.ollama_port
    }

    pub fn get_model_name(&self) -> &str {
        &self.model_name
    }

    fn endpoint(&self) -> String {
        format!("{}:{}/api/generate", self.ollama_host, self.ollama_port)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    format: &'a Value,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// A local Ollama server, using its structured-output `format` parameter.
pub struct OllamaModel {
    client: Arc<Client>,
    config: OllamaConfig,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl OllamaModel {
    pub fn new(config: OllamaConfig, client: Client) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for OllamaModel {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let body = GenerateRequest {
            model: &self.config.model_name,
            prompt: &request.prompt,
            format: &request.schema,
            stream: false,
        };

        debug!("POST {} ({})", self.config.endpoint(), request.name);
        let response = self
            .client
            .post(self.config.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::generation(format!(
                    "Ollama is not available at {}:{}: {}. Please ensure Ollama is running and the model '{}' is installed.",
                    self.config.ollama_host, self.config.ollama_port, e, self.config.model_name
                ))
            })?;
        let response = ensure_success("Ollama", response).await?;
        let reply = response.json::<GenerateResponse>().await?;
        parse_json_content(&reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_config_from_url() {
        let config = OllamaConfig::from_url("http://gpu-box:9999/llama3.1:8b").unwrap();
        assert_eq!(config.get_ollama_host(), "http://gpu-box");
        assert_eq!(config.get_ollama_port(), 9999);
        assert_eq!(config.get_model_name(), "llama3.1:8b");

        let config = OllamaConfig::from_url("http://localhost").unwrap();
        assert_eq!(config, OllamaConfig::default());

        assert!(OllamaConfig::from_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_generate_reads_response_field() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "model": "gemma3:12b",
                    "response": "{\"AI\": \"AI\", \"Tech\": \"Tech\"}",
                    "done": true
                }));
            })
            .await;

        let config = OllamaConfig::from_url(&server.base_url()).unwrap();
        let model = OllamaModel::new(config, Client::new());
        let request = GenerationRequest::new("unify_topics", "Topics to unify: [\"AI\",\"Tech\"]", json!({"type": "object"}));

        let value = model.generate(&request).await.unwrap();
        mock.assert_async().await;
        assert_eq!(value, json!({"AI": "AI", "Tech": "Tech"}));
    }
}
