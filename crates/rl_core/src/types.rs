use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Label used for articles that have no topic yet.
pub const DEFAULT_TOPIC: &str = "General";

/// Mapping from an existing topic to its canonical label.
pub type TopicMap = BTreeMap<String, String>;

/// A saved reading item, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "minutes")]
    pub estimated_time: Option<u32>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: i64,
}

impl Article {
    /// Creates an unread article with a fresh id and no metadata.
    pub fn new(url: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            headline: None,
            topic: None,
            summary: None,
            estimated_time: None,
            is_read: false,
            created_at,
        }
    }

    /// The stored topic, or [`DEFAULT_TOPIC`] when there is none.
    pub fn effective_topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(DEFAULT_TOPIC)
    }

    pub fn with_default_topic(mut self) -> Self {
        if self.topic.is_none() {
            self.topic = Some(DEFAULT_TOPIC.to_string());
        }
        self
    }
}

/// A partial update. Only fields that are `Some` are applied; `id` and
/// `createdAt` are not representable.
///
/// Setting a text field to an empty string clears it, as does setting
/// `estimatedTime` to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

impl ArticleFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn estimated_time(mut self, minutes: u32) -> Self {
        self.estimated_time = Some(minutes);
        self
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = Some(is_read);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields set in `overrides` win; everything else is kept from `self`.
    pub fn merged_with(self, overrides: ArticleFields) -> Self {
        Self {
            url: overrides.url.or(self.url),
            headline: overrides.headline.or(self.headline),
            topic: overrides.topic.or(self.topic),
            summary: overrides.summary.or(self.summary),
            estimated_time: overrides.estimated_time.or(self.estimated_time),
            is_read: overrides.is_read.or(self.is_read),
        }
    }

    /// Shallow-merges these fields onto `article`.
    pub fn apply_to(&self, article: &mut Article) {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            article.url = url.to_string();
        }
        if let Some(headline) = &self.headline {
            article.headline = text(headline);
        }
        if let Some(topic) = &self.topic {
            article.topic = text(topic.trim());
        }
        if let Some(summary) = &self.summary {
            article.summary = text(summary);
        }
        if let Some(minutes) = self.estimated_time {
            article.estimated_time = (minutes > 0).then_some(minutes);
        }
        if let Some(is_read) = self.is_read {
            article.is_read = is_read;
        }
    }
}

/// Metadata derived for an article by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    pub headline: String,
    pub topic: String,
    pub estimated_reading_time: u32,
    pub summary: String,
}

impl From<ArticleMetadata> for ArticleFields {
    fn from(metadata: ArticleMetadata) -> Self {
        Self {
            url: None,
            headline: Some(metadata.headline),
            topic: Some(metadata.topic),
            summary: Some(metadata.summary),
            estimated_time: Some(metadata.estimated_reading_time),
            is_read: None,
        }
    }
}

/// Criteria for picking the next unread article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionFilter {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub max_minutes: Option<u32>,
}

impl SuggestionFilter {
    /// Unread, on the requested topic, and known to fit in the time budget.
    /// Articles with an unknown reading time never fit a budget.
    pub fn matches(&self, article: &Article) -> bool {
        if article.is_read {
            return false;
        }
        if let Some(topic) = self.topic.as_deref().filter(|t| !t.is_empty()) {
            if article.effective_topic() != topic {
                return false;
            }
        }
        match self.max_minutes {
            Some(budget) => article.estimated_time.is_some_and(|minutes| minutes <= budget),
            None => true,
        }
    }
}

fn text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

// Stored records may carry 0 (unknown) or a fractional estimate.
fn minutes<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|m| m.is_finite() && *m >= 0.5)
        .map(|m| m.round().min(u32::MAX as f64) as u32))
}
