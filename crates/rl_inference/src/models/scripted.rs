use std::collections::VecDeque;
use std::sync::Mutex;

use rl_core::{Error, GenerationRequest, Result, TextGenerator};
use serde_json::Value;

/// Replays canned replies in order and records every request it receives.
/// Used to test callers of [`TextGenerator`] without a network.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<Value, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, value: Value) -> Self {
        self.push(Ok(value));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, reply: std::result::Result<Value, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedModel {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| Error::generation(format!("scripted model lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(Error::generation(message)),
            None => Err(Error::generation("scripted model has no replies left")),
        }
    }
}
