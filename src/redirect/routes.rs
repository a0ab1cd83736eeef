use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::registry::UrlRegistry;

use super::handlers::{redirect_url, RedirectState};
use super::middleware::record_timing;

/// Redirect route, meant to be nested under `/s`
pub fn create_redirect_router(registry: Arc<UrlRegistry>, redirect_mode: RedirectMode) -> Router {
    let state = Arc::new(RedirectState {
        registry,
        redirect_mode,
    });

    Router::new()
        .route("/{code}", get(redirect_url))
        .layer(middleware::from_fn(record_timing))
        .with_state(state)
}
