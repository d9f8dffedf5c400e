use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rl_core::{Article, ArticleFields, ArticleMetadata, SuggestionFilter, TopicMap};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::actions::{ActionResult, GenerateMetadataInput, UnifyTopicsInput};
use crate::AppState;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: Option<bool>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub max_minutes: Option<u32>,
}

/// `topic` or `max_minutes` turn the listing into a suggestion query, which
/// only ever returns unread articles.
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Article>> {
    let articles = if query.topic.is_some() || query.max_minutes.is_some() {
        state.store.suggest(&SuggestionFilter {
            topic: query.topic,
            max_minutes: query.max_minutes,
        })
    } else if query.unread.unwrap_or(false) {
        state.store.unread()
    } else {
        state.store.list()
    };
    Json(articles)
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(mut fields): Json<ArticleFields>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let url = fields
        .url
        .take()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;
    let article = state.store.create(fields, url.trim());
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    state.store.get_by_id(&id).map(Json).ok_or(ApiError::NotFound(id))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(fields): Json<ArticleFields>,
) -> Result<Json<Article>, ApiError> {
    state.store.update(&id, fields).map(Json).ok_or(ApiError::NotFound(id))
}

pub async fn delete_article(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    state.store.delete(&id);
    StatusCode::NO_CONTENT
}

pub async fn toggle_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    state.store.toggle_read(&id).map(Json).ok_or(ApiError::NotFound(id))
}

/// Regenerate metadata for a saved article and merge it in. On failure the
/// article is left untouched.
pub async fn regenerate_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResult<Article>>, ApiError> {
    let article = state.store.get_by_id(&id).ok_or_else(|| ApiError::NotFound(id.clone()))?;
    let result = state
        .actions
        .generate_metadata(GenerateMetadataInput { url: article.url })
        .await;

    let envelope = match result.into_result() {
        Ok(metadata) => match state.store.update(&id, metadata.into()) {
            Some(updated) => ActionResult::ok(updated),
            None => ActionResult::err(ApiError::NotFound(id).to_string()),
        },
        Err(message) => ActionResult::err(message),
    };
    Ok(Json(envelope))
}

pub async fn list_topics(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store.unique_topics())
}

pub async fn apply_topics(
    State(state): State<Arc<AppState>>,
    Json(map): Json<TopicMap>,
) -> Json<serde_json::Value> {
    let updated = state.store.apply_topic_map(&map);
    Json(json!({ "updated": updated }))
}

pub async fn generate_metadata(
    State(state): State<Arc<AppState>>,
    Json(input): Json<GenerateMetadataInput>,
) -> Json<ActionResult<ArticleMetadata>> {
    Json(state.actions.generate_metadata(input).await)
}

pub async fn unify_topics(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UnifyTopicsInput>,
) -> Json<ActionResult<TopicMap>> {
    Json(state.actions.unify_topics(input).await)
}
