use std::collections::BTreeSet;
use std::sync::Arc;

use rl_core::{Error, GenerationRequest, Result, TextGenerator, TopicMap};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::schema::{generation_failure, topic_map_schema};

pub const UNIFY_TOPICS_PROMPT: &str = "unify_topics";

/// Merges near-duplicate topic labels into canonical ones.
#[derive(Debug, Clone)]
pub struct TopicUnifier {
    model: Arc<dyn TextGenerator>,
}

impl TopicUnifier {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    pub fn prompt(topics_json: &str) -> String {
        format!(
            r#"You are an AI assistant that helps organize article topics. Given a list of topics, your task is to unify similar or related topics into a single, more general topic.

For example, if you are given the topics: ["AI", "Artificial Intelligence", "Machine Learning", "Tech", "Technology"], a good unification would be:
{{
  "AI": "Artificial Intelligence",
  "Artificial Intelligence": "Artificial Intelligence",
  "Machine Learning": "Artificial Intelligence",
  "Tech": "Technology",
  "Technology": "Technology"
}}

Only unify topics that are very similar. If a topic is unique, it should map to itself. Return a JSON object where keys are the original topics and values are the new, unified topics.

Topics to unify: {}
"#,
            topics_json
        )
    }

    /// Map every input topic to its canonical label.
    ///
    /// Keys are the caller's strings exactly as given. The model only sees
    /// the trimmed, non-blank labels; padded inputs take the label of their
    /// trimmed form and blank inputs map to themselves. With fewer than two
    /// distinct labels there is nothing to merge and the model is not called.
    pub async fn unify(&self, topics: &[String]) -> Result<TopicMap> {
        let labels = distinct(topics);
        if labels.len() < 2 {
            return Ok(expand(topics, &identity(&labels)));
        }

        let topics_json = serde_json::to_string(&labels)?;
        let request = GenerationRequest::new(UNIFY_TOPICS_PROMPT, Self::prompt(&topics_json), topic_map_schema())
            .with_input(json!({ "topics": labels }));
        debug!("Unifying {} topics with {}", labels.len(), self.model.name());

        let reply = self.model.generate(&request).await.map_err(generation_failure)?;
        let map = expand(topics, &validate_topic_map(&labels, reply)?);
        let merged = map.iter().filter(|(from, to)| from != to).count();
        info!("Topic unification proposes {} relabellings", merged);
        Ok(map)
    }
}

/// Check that `reply` is a flat string-to-string object covering `topics`.
/// Keys that were not asked about are dropped.
pub fn validate_topic_map(topics: &[String], reply: Value) -> Result<TopicMap> {
    let Value::Object(entries) = reply else {
        return Err(Error::generation("topic map reply is not a JSON object"));
    };

    let mut map = TopicMap::new();
    for (from, to) in entries {
        let Value::String(to) = to else {
            return Err(Error::generation(format!("topic map value for '{}' is not a string", from)));
        };
        if !topics.contains(&from) {
            debug!("Ignoring unrequested topic '{}' in model reply", from);
            continue;
        }
        let to = to.trim();
        if to.is_empty() {
            return Err(Error::generation(format!("topic map value for '{}' is empty", from)));
        }
        map.insert(from, to.to_string());
    }

    let missing: Vec<&str> = topics
        .iter()
        .filter(|topic| !map.contains_key(*topic))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(Error::generation(format!(
            "topic map is missing {} topic(s): {}",
            missing.len(),
            missing.join(", ")
        )));
    }
    Ok(map)
}

pub fn identity(topics: &[String]) -> TopicMap {
    topics.iter().map(|t| (t.clone(), t.clone())).collect()
}

// Re-key `canonical` (indexed by trimmed label) by the original inputs.
fn expand(topics: &[String], canonical: &TopicMap) -> TopicMap {
    topics
        .iter()
        .map(|topic| {
            let to = canonical.get(topic.trim()).cloned().unwrap_or_else(|| topic.clone());
            (topic.clone(), to)
        })
        .collect()
}

// Blank labels are dropped, first occurrence wins.
fn distinct(topics: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScriptedModel;

    fn topics(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fewer_than_two_topics_skip_the_model() {
        let model = Arc::new(ScriptedModel::new());
        let unifier = TopicUnifier::new(model.clone());

        assert_eq!(unifier.unify(&[]).await.unwrap(), TopicMap::new());

        let solo = unifier.unify(&topics(&["Solo"])).await.unwrap();
        assert_eq!(solo, identity(&topics(&["Solo"])));

        let duplicated = unifier.unify(&topics(&["Solo", "Solo"])).await.unwrap();
        assert_eq!(duplicated.len(), 1);

        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_every_input_topic_is_a_key() {
        let model = Arc::new(ScriptedModel::new().reply(json!({
            "AI": "Artificial Intelligence",
            "Artificial Intelligence": "Artificial Intelligence",
            "Tech": "Tech"
        })));
        let unifier = TopicUnifier::new(model.clone());
        let input = topics(&["AI", "Artificial Intelligence", "Tech"]);

        let map = unifier.unify(&input).await.unwrap();
        for topic in &input {
            assert!(map.contains_key(topic), "missing {}", topic);
        }
        assert_eq!(map["AI"], "Artificial Intelligence");
        assert_eq!(map["Tech"], "Tech");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, UNIFY_TOPICS_PROMPT);
        assert!(requests[0].prompt.contains(r#"["AI","Artificial Intelligence","Tech"]"#));
        assert_eq!(requests[0].input["topics"], json!(input));
    }

    #[tokio::test]
    async fn test_padded_and_blank_topics_keep_their_keys() {
        let model = Arc::new(ScriptedModel::new().reply(json!({ "AI": "AI", "Tech": "Technology" })));
        let unifier = TopicUnifier::new(model.clone());

        let map = unifier.unify(&topics(&[" AI", "Tech", ""])).await.unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map[" AI"], "AI");
        assert_eq!(map["Tech"], "Technology");
        assert_eq!(map[""], "");
        assert_eq!(model.requests()[0].input["topics"], json!(["AI", "Tech"]));

        let solo = unifier.unify(&topics(&["", "Solo"])).await.unwrap();
        assert_eq!(solo, identity(&topics(&["", "Solo"])));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_map_is_rejected() {
        let model = Arc::new(ScriptedModel::new().reply(json!({ "AI": "Artificial Intelligence" })));
        let unifier = TopicUnifier::new(model);

        let err = unifier.unify(&topics(&["AI", "Tech"])).await.unwrap_err();
        assert!(matches!(err, Error::Generation(ref m) if m.contains("Tech")));
    }

    #[tokio::test]
    async fn test_model_error_is_a_generation_failure() {
        let model = Arc::new(ScriptedModel::new().fail("connection reset"));
        let unifier = TopicUnifier::new(model);

        let err = unifier.unify(&topics(&["AI", "Tech"])).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_validate_topic_map_shape() {
        let input = topics(&["A", "B"]);
        assert!(validate_topic_map(&input, json!(["A", "B"])).is_err());
        assert!(validate_topic_map(&input, json!({"A": "A", "B": {"nested": true}})).is_err());
        assert!(validate_topic_map(&input, json!({"A": "A", "B": " "})).is_err());

        let map = validate_topic_map(&input, json!({"A": "A", "B": "A", "C": "A"})).unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("C"));
    }
}
