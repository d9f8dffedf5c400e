use std::collections::HashMap;
use std::fmt;

use rl_core::{Error, GenerationRequest, Result, TextGenerator, TopicMap};
use serde_json::{json, Value};
use url::Url;

use crate::metadata::METADATA_PROMPT;
use crate::topics::UNIFY_TOPICS_PROMPT;

const DUMMY_READING_TIME: u32 = 5;

/// Offline stand-in for a real model, for demos and running without
/// credentials. Answers are derived from the request input alone.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn metadata(&self, input: &Value) -> Result<Value> {
        let url = input["url"]
            .as_str()
            .ok_or_else(|| Error::generation("dummy model needs a 'url' input"))?;
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let host = url.host_str().unwrap_or("unknown").trim_start_matches("www.");

        // Take first segment of the host as the topic
        let topic = title_case(host.split('.').next().unwrap_or(host));
        let headline = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|slug| title_case(&slug.replace(['-', '_'], " ")))
            .unwrap_or_else(|| host.to_string());

        Ok(json!({
            "headline": headline,
            "topic": topic,
            "estimatedReadingTime": DUMMY_READING_TIME,
            "summary": format!("An article saved from {}.", host),
        }))
    }

    // Labels that differ only in case or punctuation collapse onto the first one seen.
    fn unify(&self, input: &Value) -> Result<Value> {
        let topics = input["topics"]
            .as_array()
            .ok_or_else(|| Error::generation("dummy model needs a 'topics' input"))?;

        let mut canonical: HashMap<String, String> = HashMap::new();
        let mut map = TopicMap::new();
        for topic in topics.iter().filter_map(Value::as_str) {
            let key: String = topic
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            let target = canonical.entry(key).or_insert_with(|| topic.to_string());
            map.insert(topic.to_string(), target.clone());
        }
        Ok(serde_json::to_value(map)?)
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextGenerator for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        match request.name.as_str() {
            METADATA_PROMPT => self.metadata(&request.input),
            UNIFY_TOPICS_PROMPT => self.unify(&request.input),
            other => Err(Error::generation(format!("dummy model has no answer for prompt '{}'", other))),
        }
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataGenerator;
    use crate::topics::TopicUnifier;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = Arc::new(DummyModel::new());

        let metadata = MetadataGenerator::new(model.clone())
            .generate("https://www.example.com/posts/why-rust-is-fast")
            .await
            .unwrap();
        assert_eq!(metadata.headline, "Why Rust Is Fast");
        assert_eq!(metadata.topic, "Example");
        assert_eq!(metadata.estimated_reading_time, DUMMY_READING_TIME);
        assert!(metadata.summary.contains("example.com"));

        let topics = vec!["AI".to_string(), "ai".to_string(), "Tech".to_string()];
        let map = TopicUnifier::new(model.clone()).unify(&topics).await.unwrap();
        assert_eq!(map["ai"], "AI");
        assert_eq!(map["AI"], "AI");
        assert_eq!(map["Tech"], "Tech");
    }

    #[tokio::test]
    async fn test_unknown_prompt() {
        let request = GenerationRequest::new("translate", "", Value::Null);
        assert!(DummyModel::new().generate(&request).await.is_err());
    }
}
