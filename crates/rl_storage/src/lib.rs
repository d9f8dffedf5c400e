use std::path::Path;
use std::sync::Arc;

use rl_core::{KeyValueStore, Result};

pub mod backends;
pub mod store;

pub use backends::*;
pub use store::ArticleStore;

/// Key the article collection is persisted under.
pub const STORAGE_KEY: &str = "offline-articles";

pub const DEFAULT_DATA_DIR: &str = ".readlater";

/// When the default topic gets filled in for articles saved without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TopicDefault {
    /// Write the default topic into the record at creation time.
    #[default]
    OnCreate,
    /// Keep the stored topic empty and only substitute it when reading.
    OnRead,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub key: String,
    pub topic_default: TopicDefault,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: STORAGE_KEY.to_string(),
            topic_default: TopicDefault::default(),
        }
    }
}

/// Build a storage backend by name (`memory` or `file`).
pub fn create_storage(kind: &str, data_dir: Option<&Path>) -> Result<Arc<dyn KeyValueStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "file" => {
            let dir = data_dir.unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR));
            Ok(Arc::new(FileStore::new(dir)?))
        }
        other => Err(rl_core::Error::Storage(format!(
            "Unknown storage backend '{}', expected one of: memory, file",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, ArticleStore, StoreConfig, TopicDefault, STORAGE_KEY};
}
