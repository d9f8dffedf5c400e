use std::fmt;
use std::time::Duration;

pub mod metadata;
pub mod models;
pub mod schema;
pub mod topics;

pub use metadata::MetadataGenerator;
pub use models::{create_model, ModelKind};
pub use topics::TopicUnifier;

/// Model selection and credentials.
#[derive(Clone, Default)]
pub struct Config {
    pub model: ModelKind,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// Base URL of the API (or `http://host:port/model` for Ollama).
    pub model_url: Option<String>,
    /// Per-request timeout for the HTTP client. `None` leaves reqwest's default.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("model_url", &self.model_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::{Config, MetadataGenerator, ModelKind, TopicUnifier};
    pub use rl_core::{ArticleMetadata, Error, Result, TextGenerator, TopicMap};
}
