use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::create_api_router;
use crate::config::RedirectMode;
use crate::redirect::create_redirect_router;
use crate::registry::UrlRegistry;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Gateway health: healthy only while the store answers
async fn health_check(
    State(registry): State<Arc<UrlRegistry>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status) = match registry.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Full application: `/health`, the URL API under `/api/urls` and redirects under `/s`
pub fn create_app(registry: Arc<UrlRegistry>, redirect_mode: RedirectMode) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(Arc::clone(&registry))
        .nest("/api/urls", create_api_router(Arc::clone(&registry)))
        .nest("/s", create_redirect_router(registry, redirect_mode))
        .layer(CorsLayer::permissive())
}
