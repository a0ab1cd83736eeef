use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::registry::UrlRegistry;

pub struct RedirectState {
    pub registry: Arc<UrlRegistry>,
    pub redirect_mode: RedirectMode,
}

/// Redirect to the target URL, counting the click
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
) -> Response {
    match state.registry.resolve(&code).await {
        Ok(Some(target_url)) => match state.redirect_mode {
            RedirectMode::Temporary => Redirect::temporary(&target_url).into_response(),
            RedirectMode::Permanent => Redirect::permanent(&target_url).into_response(),
        },
        Ok(None) => (StatusCode::NOT_FOUND, "URL not found").into_response(),
        Err(e) => {
            tracing::error!(short_code = %code, error = %e, "failed to resolve short code");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
