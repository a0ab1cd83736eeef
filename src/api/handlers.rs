use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{CreateUrlRequest, ListUrlsResponse, ShortenResponse, UrlStatsResponse};
use crate::registry::{RegistryError, UrlRegistry};

pub struct AppState {
    pub registry: Arc<UrlRegistry>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub service: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Create a new short URL
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), ApiError> {
    if payload.url.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "URL cannot be empty"));
    }

    // An explicit deadline wins over a relative one
    let expires_at = match (payload.expires_at, payload.expires_in_days) {
        (Some(at), _) => Some(at),
        (None, Some(days)) => {
            if days <= 0 {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    "expires_in_days must be positive",
                ));
            }
            let at = Duration::try_days(days)
                .and_then(|d| Utc::now().checked_add_signed(d))
                .ok_or_else(|| {
                    api_error(StatusCode::BAD_REQUEST, "expires_in_days is too large")
                })?;
            Some(at)
        }
        (None, None) => None,
    };

    match state
        .registry
        .create(&payload.url, payload.custom_code.as_deref(), expires_at)
        .await
    {
        Ok(link) => Ok((StatusCode::CREATED, Json(link.into()))),
        Err(RegistryError::EmptyUrl) => {
            Err(api_error(StatusCode::BAD_REQUEST, "URL cannot be empty"))
        }
        Err(e) => {
            tracing::error!("Error creating short URL: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while creating the short URL",
            ))
        }
    }
}

/// Get click statistics for a short code
pub async fn get_url_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<UrlStatsResponse>, ApiError> {
    match state.registry.get_stats(&code).await {
        Ok(Some(stats)) => Ok(Json(stats.into())),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "Stats not found")),
        Err(e) => {
            tracing::error!("Error getting URL stats: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while retrieving statistics",
            ))
        }
    }
}

/// List all short URLs
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListUrlsResponse>, ApiError> {
    match state.registry.list_all().await {
        Ok(urls) => Ok(Json(ListUrlsResponse {
            count: urls.len(),
            urls,
        })),
        Err(e) => {
            tracing::error!("Error listing URLs: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while listing short URLs",
            ))
        }
    }
}

/// Delete a short URL
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.registry.delete(&code).await {
        Ok(_) => Ok(Json(SuccessResponse {
            message: "Short URL deleted successfully".to_string(),
        })),
        Err(e) => {
            tracing::error!("Error deleting short URL: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while deleting the short URL",
            ))
        }
    }
}

/// URL service health check endpoint
pub async fn health_check() -> Json<ServiceHealth> {
    tracing::debug!("URL service health check requested");
    Json(ServiceHealth {
        status: "healthy",
        service: "url_shortener",
    })
}
