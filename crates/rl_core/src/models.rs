use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::Result;

/// A structured generation request: an instruction plus the JSON schema the
/// answer has to follow.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Identifies the prompt, e.g. `generate_article_metadata`.
    pub name: String,
    /// The values the prompt was rendered from.
    pub input: Value,
    pub prompt: String,
    pub schema: Value,
}

impl GenerationRequest {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            input: Value::Null,
            prompt: prompt.into(),
            schema,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }
}

/// Structured text generation backed by a language model.
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run the prompt and return the model's answer parsed as JSON.
    ///
    /// Implementations only guarantee the answer is JSON; matching it against
    /// `request.schema` is the caller's job.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;
}
