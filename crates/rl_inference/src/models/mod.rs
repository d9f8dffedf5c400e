use std::sync::Arc;

use reqwest::{Client, Response};
use rl_core::{Error, Result, TextGenerator};
use tracing::info;

use crate::Config;

pub mod dummy;
pub mod ollama;
pub mod openai;
pub mod scripted;

pub use dummy::DummyModel;
pub use ollama::{OllamaConfig, OllamaModel};
pub use openai::OpenAiModel;
pub use scripted::ScriptedModel;

const MAX_ERROR_BODY: usize = 500;

/// Which backend answers generation requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelKind {
    /// Google Gemini through its OpenAI-compatible API.
    #[default]
    Gemini,
    /// OpenAI, or any server exposing `/chat/completions`.
    Openai,
    /// A local Ollama server.
    Ollama,
    /// Offline heuristics, no network.
    Dummy,
}

pub fn create_model(config: &Config) -> Result<Arc<dyn TextGenerator>> {
    let model: Arc<dyn TextGenerator> = match config.model {
        ModelKind::Gemini => Arc::new(OpenAiModel::new(
            "Gemini",
            config.model_url.as_deref().unwrap_or(openai::GEMINI_BASE_URL),
            config.model_name.as_deref().unwrap_or(openai::GEMINI_DEFAULT_MODEL),
            config.api_key.clone(),
            http_client(config)?,
        )?),
        ModelKind::Openai => Arc::new(OpenAiModel::new(
            "OpenAI",
            config.model_url.as_deref().unwrap_or(openai::OPENAI_BASE_URL),
            config.model_name.as_deref().unwrap_or(openai::OPENAI_DEFAULT_MODEL),
            config.api_key.clone(),
            http_client(config)?,
        )?),
        ModelKind::Ollama => {
            let mut ollama = OllamaConfig::from_url(config.model_url.as_deref().unwrap_or(ollama::DEFAULT_OLLAMA_URL))?;
            if let Some(name) = &config.model_name {
                ollama = ollama.with_model_name(name.clone());
            }
            Arc::new(OllamaModel::new(ollama, http_client(config)?))
        }
        ModelKind::Dummy => Arc::new(DummyModel::new()),
    };
    info!("Using {} for generation", model.name());
    Ok(model)
}

fn http_client(config: &Config) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Turn a non-2xx reply into a generation failure carrying the status and
/// the start of the body.
pub(crate) async fn ensure_success(label: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(Error::generation(format!("{} returned {}: {}", label, status, body.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model() {
        let dummy = create_model(&Config {
            model: ModelKind::Dummy,
            ..Config::default()
        })
        .unwrap();
        assert_eq!(dummy.name(), "Dummy");

        let missing_key = create_model(&Config::default());
        assert!(missing_key.is_err());

        let gemini = create_model(&Config {
            api_key: Some("test-key".to_string()),
            ..Config::default()
        })
        .unwrap();
        assert_eq!(gemini.name(), "Gemini");

        let ollama = create_model(&Config {
            model: ModelKind::Ollama,
            model_name: Some("llama3.1".to_string()),
            ..Config::default()
        })
        .unwrap();
        assert_eq!(ollama.name(), "Ollama");
    }
}
