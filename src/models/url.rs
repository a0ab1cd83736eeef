use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation-time facts stored alongside a short code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    /// `None` when the default retention window applies
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of creating a short link
#[derive(Debug, Clone, Serialize)]
pub struct CreatedLink {
    pub code: String,
    pub short_url: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    pub code: String,
    pub target_url: Option<String>,
    pub click_count: u64,
    /// Resolution timestamps, newest first
    pub click_log: Vec<DateTime<Utc>>,
    pub metadata: Option<LinkMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub code: String,
    pub target_url: String,
    pub metadata: Option<LinkMetadata>,
    pub click_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub original_url: String,
    pub short_code: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlStatsResponse {
    pub short_code: String,
    pub original_url: Option<String>,
    pub click_count: u64,
    pub click_log: Vec<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ListUrlsResponse {
    pub count: usize,
    pub urls: Vec<LinkSummary>,
}

impl From<CreatedLink> for ShortenResponse {
    fn from(link: CreatedLink) -> Self {
        Self {
            short_url: link.short_url,
            original_url: link.target_url,
            short_code: link.code,
            expires_at: link.expires_at,
        }
    }
}

impl From<LinkStats> for UrlStatsResponse {
    fn from(stats: LinkStats) -> Self {
        let (created_at, expires_at) = stats
            .metadata
            .as_ref()
            .map(|m| (Some(m.created_at), m.expires_at))
            .unwrap_or((None, None));

        Self {
            short_code: stats.code,
            original_url: stats.target_url,
            click_count: stats.click_count,
            click_log: stats.click_log,
            created_at,
            expires_at,
        }
    }
}
