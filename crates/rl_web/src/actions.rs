//! The boundary the UI calls to run generation. Every action resolves to an
//! [`ActionResult`]; failures (including panics) never escape.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use rl_core::{ArticleMetadata, Result, TextGenerator, TopicMap};
use rl_inference::{MetadataGenerator, TopicUnifier};
use serde::{Deserialize, Serialize};
use tracing::error;

const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// `{"success": true, "data": ...}` or `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            error: Some(if message.trim().is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            }),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateMetadataInput {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifyTopicsInput {
    pub topics: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Actions {
    metadata: MetadataGenerator,
    topics: TopicUnifier,
}

impl Actions {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self {
            metadata: MetadataGenerator::new(model.clone()),
            topics: TopicUnifier::new(model),
        }
    }

    pub async fn generate_metadata(&self, input: GenerateMetadataInput) -> ActionResult<ArticleMetadata> {
        run("AI metadata generation", self.metadata.generate(&input.url)).await
    }

    pub async fn unify_topics(&self, input: UnifyTopicsInput) -> ActionResult<TopicMap> {
        run("AI topic unification", self.topics.unify(&input.topics)).await
    }
}

async fn run<T, F>(action: &str, future: F) -> ActionResult<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(data)) => ActionResult::ok(data),
        Ok(Err(e)) => {
            error!("{} failed: {}", action, e);
            ActionResult::err(e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("{} panicked: {}", action, message);
            ActionResult::err(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        UNKNOWN_ERROR.to_string()
    }
}
