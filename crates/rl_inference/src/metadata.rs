use std::sync::Arc;

use rl_core::{ArticleMetadata, Error, GenerationRequest, Result, TextGenerator};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::schema::{generation_failure, metadata_schema};

pub const METADATA_PROMPT: &str = "generate_article_metadata";

/// Derives headline, topic, reading time and summary for an article URL.
#[derive(Debug, Clone)]
pub struct MetadataGenerator {
    model: Arc<dyn TextGenerator>,
}

impl MetadataGenerator {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    pub fn prompt(url: &Url) -> String {
        format!(
            "You are an AI article metadata generator. Given a URL to an article, you will generate \
             a headline, a single best-fit topic, an estimated reading time (in whole minutes), and a \
             one-line summary.\n\nURL: {}\n",
            url
        )
    }

    /// The URL is not fetched; the model works from the URL alone.
    pub async fn generate(&self, url: &str) -> Result<ArticleMetadata> {
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{} ({})", url, e)))?;

        let request = GenerationRequest::new(METADATA_PROMPT, Self::prompt(&url), metadata_schema())
            .with_input(json!({ "url": url.as_str() }));
        debug!("Requesting metadata for {} from {}", url, self.model.name());

        let reply = self.model.generate(&request).await.map_err(generation_failure)?;
        let metadata = validate_metadata(reply)?;
        info!("Generated metadata for {}: {:?}", url, metadata.headline);
        Ok(metadata)
    }
}

/// Check a model reply against the metadata contract.
///
/// Headline and topic must be non-blank, the summary must be a string, and the
/// reading time must be a positive number of minutes (rounded, at least 1).
pub fn validate_metadata(reply: Value) -> Result<ArticleMetadata> {
    let Value::Object(fields) = reply else {
        return Err(Error::generation("metadata reply is not a JSON object"));
    };

    let headline = required_text(&fields, "headline", false)?;
    let topic = required_text(&fields, "topic", false)?;
    let summary = required_text(&fields, "summary", true)?;
    let estimated_reading_time = reading_time(&fields)?;

    Ok(ArticleMetadata {
        headline,
        topic,
        estimated_reading_time,
        summary,
    })
}

fn required_text(fields: &Map<String, Value>, name: &str, allow_blank: bool) -> Result<String> {
    match fields.get(name) {
        Some(Value::String(s)) if allow_blank || !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(Error::generation(format!("metadata field '{}' is empty", name))),
        Some(_) => Err(Error::generation(format!("metadata field '{}' is not a string", name))),
        None => Err(Error::generation(format!("metadata field '{}' is missing", name))),
    }
}

fn reading_time(fields: &Map<String, Value>) -> Result<u32> {
    let minutes = match fields.get("estimatedReadingTime") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => {
            return Err(Error::generation("metadata field 'estimatedReadingTime' is missing"));
        }
    };
    match minutes {
        Some(m) if m.is_finite() && m > 0.0 => Ok(m.round().clamp(1.0, u32::MAX as f64) as u32),
        _ => Err(Error::generation(
            "metadata field 'estimatedReadingTime' is not a positive number of minutes",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScriptedModel;

    fn valid_reply() -> Value {
        json!({
            "headline": "Understanding Ownership",
            "topic": "Rust",
            "estimatedReadingTime": 9,
            "summary": "How Rust manages memory without a garbage collector."
        })
    }

    #[tokio::test]
    async fn test_generate_returns_validated_metadata() {
        let model = Arc::new(ScriptedModel::new().reply(valid_reply()));
        let generator = MetadataGenerator::new(model.clone());

        let metadata = generator.generate("https://doc.rust-lang.org/book/ch04-00.html").await.unwrap();
        assert_eq!(metadata.headline, "Understanding Ownership");
        assert_eq!(metadata.topic, "Rust");
        assert_eq!(metadata.estimated_reading_time, 9);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, METADATA_PROMPT);
        assert!(requests[0].prompt.contains("https://doc.rust-lang.org/book/ch04-00.html"));
        assert_eq!(requests[0].input["url"], "https://doc.rust-lang.org/book/ch04-00.html");
        assert_eq!(requests[0].schema, metadata_schema());
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_the_model() {
        let model = Arc::new(ScriptedModel::new().reply(valid_reply()));
        let generator = MetadataGenerator::new(model.clone());

        let err = generator.generate("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_a_generation_failure() {
        let model = Arc::new(ScriptedModel::new().fail("quota exceeded"));
        let generator = MetadataGenerator::new(model);

        let err = generator.generate("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::Generation(ref m) if m.contains("quota exceeded")));
    }

    #[tokio::test]
    async fn test_non_conforming_reply_is_rejected() {
        let model = Arc::new(ScriptedModel::new().reply(json!({"headline": "Only a headline"})));
        let generator = MetadataGenerator::new(model);

        let err = generator.generate("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_validate_metadata() {
        assert!(validate_metadata(valid_reply()).is_ok());
        assert!(validate_metadata(json!(["not", "an", "object"])).is_err());

        let mut reply = valid_reply();
        reply["topic"] = json!("   ");
        assert!(validate_metadata(reply).is_err());

        let mut reply = valid_reply();
        reply["estimatedReadingTime"] = json!(0);
        assert!(validate_metadata(reply).is_err());

        let mut reply = valid_reply();
        reply["estimatedReadingTime"] = json!(-3);
        assert!(validate_metadata(reply).is_err());

        let mut reply = valid_reply();
        reply["headline"] = json!(42);
        assert!(validate_metadata(reply).is_err());
    }

    #[test]
    fn test_reading_time_is_normalized() {
        let mut reply = valid_reply();
        reply["estimatedReadingTime"] = json!(6.6);
        assert_eq!(validate_metadata(reply).unwrap().estimated_reading_time, 7);

        let mut reply = valid_reply();
        reply["estimatedReadingTime"] = json!(0.2);
        assert_eq!(validate_metadata(reply).unwrap().estimated_reading_time, 1);

        let mut reply = valid_reply();
        reply["estimatedReadingTime"] = json!("12");
        assert_eq!(validate_metadata(reply).unwrap().estimated_reading_time, 12);
    }
}
