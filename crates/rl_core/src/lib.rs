pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{GenerationRequest, TextGenerator};
pub use storage::KeyValueStore;
pub use types::{Article, ArticleFields, ArticleMetadata, SuggestionFilter, TopicMap, DEFAULT_TOPIC};
