use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use rl_core::{Article, ArticleFields, KeyValueStore, SuggestionFilter, TopicMap};
use tracing::{debug, info, warn};

use crate::{StoreConfig, TopicDefault};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Owner of the persisted article collection.
///
/// Every public operation is total: when the storage medium is missing or
/// fails, reads come back empty and writes are dropped (and logged).
///
/// Mutations hold `write_lock` across the whole load-modify-save.
pub struct ArticleStore {
    storage: Option<Arc<dyn KeyValueStore>>,
    config: StoreConfig,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl fmt::Debug for ArticleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleStore")
            .field("storage", &self.storage.as_ref().map(|s| s.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

impl ArticleStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(Some(storage), StoreConfig::default())
    }

    pub fn with_config(storage: Option<Arc<dyn KeyValueStore>>, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
            write_lock: Mutex::new(()),
        }
    }

    /// A store without any storage medium behind it.
    pub fn unavailable() -> Self {
        Self::with_config(None, StoreConfig::default())
    }

    /// Replace the source of `createdAt` timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// All articles, newest first, with the default topic filled in.
    pub fn list(&self) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .load()
            .into_iter()
            .map(Article::with_default_topic)
            .collect();
        // Stable: equal timestamps keep stored order, which is newest first.
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        articles
    }

    pub fn get_by_id(&self, id: &str) -> Option<Article> {
        self.list().into_iter().find(|article| article.id == id)
    }

    /// Save a new, unread article for `url`, pre-filled with `fields`.
    pub fn create(&self, fields: ArticleFields, url: impl Into<String>) -> Article {
        let mut article = Article::new(url, (self.clock)());
        let url = std::mem::take(&mut article.url);
        fields.apply_to(&mut article);
        article.url = url;
        article.is_read = false;
        if self.config.topic_default == TopicDefault::OnCreate {
            article = article.with_default_topic();
        }

        let _guard = self.write_guard();
        let mut articles = self.load();
        articles.insert(0, article.clone());
        self.save(&articles);
        info!("Saved article {} ({})", article.id, article.url);
        article
    }

    /// Merge `fields` onto the article with `id`. `None` when there is no
    /// such article, in which case nothing is written.
    pub fn update(&self, id: &str, fields: ArticleFields) -> Option<Article> {
        let _guard = self.write_guard();
        let mut articles = self.load();
        let article = articles.iter_mut().find(|article| article.id == id)?;
        fields.apply_to(article);
        let updated = article.clone();
        self.save(&articles);
        debug!("Updated article {}", id);
        Some(updated.with_default_topic())
    }

    pub fn delete(&self, id: &str) {
        let _guard = self.write_guard();
        let mut articles = self.load();
        let before = articles.len();
        articles.retain(|article| article.id != id);
        if articles.len() != before {
            self.save(&articles);
            info!("Deleted article {}", id);
        }
    }

    /// Distinct effective topics in ascending order.
    pub fn unique_topics(&self) -> Vec<String> {
        self.list()
            .iter()
            .map(|article| article.effective_topic().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn unread(&self) -> Vec<Article> {
        self.list().into_iter().filter(|article| !article.is_read).collect()
    }

    pub fn suggest(&self, filter: &SuggestionFilter) -> Vec<Article> {
        self.list().into_iter().filter(|article| filter.matches(article)).collect()
    }

    pub fn set_read(&self, id: &str, is_read: bool) -> Option<Article> {
        self.update(id, ArticleFields::new().read(is_read))
    }

    pub fn toggle_read(&self, id: &str) -> Option<Article> {
        let _guard = self.write_guard();
        let mut articles = self.load();
        let article = articles.iter_mut().find(|article| article.id == id)?;
        article.is_read = !article.is_read;
        let toggled = article.clone();
        self.save(&articles);
        Some(toggled.with_default_topic())
    }

    /// Relabel every article whose effective topic is a key of `map`.
    /// Returns how many articles changed.
    pub fn apply_topic_map(&self, map: &TopicMap) -> usize {
        let _guard = self.write_guard();
        let mut articles = self.load();
        let mut changed = 0;
        for article in articles.iter_mut() {
            let Some(target) = map.get(article.effective_topic()) else {
                continue;
            };
            if target.is_empty() || target == article.effective_topic() {
                continue;
            }
            article.topic = Some(target.clone());
            changed += 1;
        }
        if changed > 0 {
            self.save(&articles);
            info!("Relabelled {} articles", changed);
        }
        changed
    }

    // A panic mid-write leaves the stored document whole, so poisoning is ignored.
    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // The raw stored collection: stored order, no topic backfill.
    fn load(&self) -> Vec<Article> {
        let Some(storage) = &self.storage else {
            return Vec::new();
        };
        let raw = match storage.get(&self.config.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read articles from {} storage: {}", storage.name(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Article>>(&raw) {
            Ok(articles) => articles,
            Err(e) => {
                warn!("Failed to parse stored articles, treating collection as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn save(&self, articles: &[Article]) {
        let Some(storage) = &self.storage else {
            return;
        };
        let json = match serde_json::to_string(articles) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize articles: {}", e);
                return;
            }
        };
        if let Err(e) = storage.set(&self.config.key, &json) {
            warn!("Failed to write articles to {} storage: {}", storage.name(), e);
        }
    }
}
