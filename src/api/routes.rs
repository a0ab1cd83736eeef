use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::registry::UrlRegistry;

use super::handlers::{create_url, delete_url, get_url_stats, health_check, list_urls, AppState};

/// Routes of the URL API, meant to be nested under `/api/urls`
pub fn create_api_router(registry: Arc<UrlRegistry>) -> Router {
    let state = Arc::new(AppState { registry });

    Router::new()
        .route("/health", get(health_check))
        .route("/create", post(create_url))
        .route("/stats/{code}", get(get_url_stats))
        .route("/list", get(list_urls))
        .route("/{code}", delete(delete_url))
        .with_state(state)
}
