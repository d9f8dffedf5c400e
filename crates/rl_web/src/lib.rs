use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod actions;
pub mod handlers;
pub mod state;

pub use actions::{ActionResult, Actions, GenerateMetadataInput, UnifyTopicsInput};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/articles", get(handlers::list_articles).post(handlers::create_article))
        .route(
            "/api/articles/:id",
            get(handlers::get_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/api/articles/:id/toggle-read", post(handlers::toggle_read))
        .route("/api/articles/:id/generate", post(handlers::regenerate_article))
        .route("/api/topics", get(handlers::list_topics))
        .route("/api/topics/apply", post(handlers::apply_topics))
        .route("/api/actions/generate-metadata", post(handlers::generate_metadata))
        .route("/api/actions/unify-topics", post(handlers::unify_topics))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> rl_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, ActionResult, Actions, AppState};
    pub use rl_core::{Article, Error, Result};
}
