//! URL registry: creation, resolution, click statistics, listing and deletion
//! of short links on top of a key/value [`Storage`].
//!
//! A short link is spread over four keys:
//!
//! ```text
//! url:{code}          target URL                     (TTL)
//! meta:{code}         LinkMetadata as JSON           (TTL)
//! clicks:{code}       resolution counter
//! clicks_log:{code}   resolution timestamps, newest first, capped
//! ```
//!
//! The `url:` entry decides whether a link exists.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{CreatedLink, LinkMetadata, LinkStats, LinkSummary};
use crate::shortcode;
use crate::storage::{Storage, StorageConnection, StorageError, StorageResult};

/// Default retention window: 30 days
pub const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Default number of click timestamps kept per code
pub const DEFAULT_CLICK_LOG_CAP: usize = 100;

const URL_PREFIX: &str = "url:";
const META_PREFIX: &str = "meta:";
const CLICKS_PREFIX: &str = "clicks:";
const CLICK_LOG_PREFIX: &str = "clicks_log:";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("target URL cannot be empty")]
    EmptyUrl,
    #[error("corrupt value at '{key}': {reason}")]
    Corrupt { key: String, reason: String },
    #[error("failed to encode link metadata: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Prefix of every shareable link, used verbatim
    pub base_url: String,
    pub default_ttl_secs: i64,
    /// Must be at least 1
    pub click_log_cap: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            default_ttl_secs: DEFAULT_TTL_SECS,
            click_log_cap: DEFAULT_CLICK_LOG_CAP,
        }
    }
}

/// Store keys for the facets of one short code
struct LinkKeys {
    url: String,
    meta: String,
    clicks: String,
    click_log: String,
}

impl LinkKeys {
    fn new(code: &str) -> Self {
        Self {
            url: format!("{URL_PREFIX}{code}"),
            meta: format!("{META_PREFIX}{code}"),
            clicks: format!("{CLICKS_PREFIX}{code}"),
            click_log: format!("{CLICK_LOG_PREFIX}{code}"),
        }
    }

    fn all(&self) -> [&str; 4] {
        [&self.url, &self.meta, &self.clicks, &self.click_log]
    }
}

pub struct UrlRegistry {
    storage: Arc<dyn Storage>,
    config: RegistryConfig,
}

impl UrlRegistry {
    pub fn new(storage: Arc<dyn Storage>, config: RegistryConfig) -> Self {
        info!("URL registry initialized (base URL: {})", config.base_url);
        Self { storage, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Check that the backing store is reachable
    pub async fn ping(&self) -> RegistryResult<()> {
        self.storage.ping().await?;
        Ok(())
    }

    /// Create a short link for `target_url`.
    ///
    /// `custom_code` is used verbatim when given; otherwise a code is
    /// generated. An existing link with the same code is overwritten.
    /// Without `expires_at` the link lives for the default TTL; an
    /// `expires_at` in the past yields a link that is already gone.
    pub async fn create(
        &self,
        target_url: &str,
        custom_code: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RegistryResult<CreatedLink> {
        if target_url.trim().is_empty() {
            return Err(RegistryError::EmptyUrl);
        }

        info!("Creating short URL for: {}", target_url);

        let code = match custom_code.filter(|c| !c.is_empty()) {
            Some(custom) => custom.to_string(),
            None => {
                let generated = shortcode::generate_code(target_url);
                debug!("Generated short code: {}", generated);
                generated
            }
        };

        let now = Utc::now();
        let ttl_secs = match expires_at {
            Some(at) => {
                let ttl = ttl_until(at, now);
                debug!("Custom expiration set: {} seconds", ttl);
                ttl
            }
            None => self.config.default_ttl_secs,
        };

        let metadata = LinkMetadata {
            target_url: target_url.to_string(),
            created_at: now,
            expires_at,
        };
        let encoded = serde_json::to_string(&metadata)?;

        let keys = LinkKeys::new(&code);
        let mut conn = self.storage.connect().await?;
        // A new link under a reused code starts with no click history
        conn.delete(&keys.clicks).await?;
        conn.delete(&keys.click_log).await?;
        conn.set_with_ttl(&keys.url, target_url, ttl_secs).await?;
        conn.set_with_ttl(&keys.meta, &encoded, ttl_secs).await?;

        let short_url = shortcode::short_url(&self.config.base_url, &code);
        info!("Successfully created short URL: {}", short_url);

        Ok(CreatedLink {
            code,
            short_url,
            target_url: metadata.target_url,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve `code` to its target URL and record the click.
    ///
    /// Click bookkeeping is best effort: if it fails the target is still
    /// returned. Unknown codes leave no trace in the store.
    pub async fn resolve(&self, code: &str) -> RegistryResult<Option<String>> {
        debug!("Looking up original URL for short code: {}", code);

        let keys = LinkKeys::new(code);
        let mut conn = self.storage.connect().await?;

        let Some(target_url) = conn.get(&keys.url).await? else {
            warn!("No URL found for short code: {}", code);
            return Ok(None);
        };

        if let Err(err) = self.record_click(conn.as_mut(), &keys).await {
            warn!(short_code = %code, error = %err, "failed to record click");
        }

        info!("Redirecting {} to {}", code, target_url);
        Ok(Some(target_url))
    }

    async fn record_click(
        &self,
        conn: &mut dyn StorageConnection,
        keys: &LinkKeys,
    ) -> StorageResult<()> {
        conn.increment(&keys.clicks).await?;
        conn.list_push_front(&keys.click_log, &encode_timestamp(Utc::now()))
            .await?;
        conn.list_trim(&keys.click_log, 0, self.last_log_index()).await?;
        Ok(())
    }

    fn last_log_index(&self) -> isize {
        self.config.click_log_cap.max(1) as isize - 1
    }

    /// Click statistics for `code`, or `None` if nothing is stored for it
    pub async fn get_stats(&self, code: &str) -> RegistryResult<Option<LinkStats>> {
        debug!("Getting stats for short code: {}", code);

        let keys = LinkKeys::new(code);
        let mut conn = self.storage.connect().await?;

        let target_url = conn.get(&keys.url).await?;
        let clicks = conn.get(&keys.clicks).await?;
        let raw_log = conn
            .list_range(&keys.click_log, 0, self.last_log_index())
            .await?;
        let raw_meta = conn.get(&keys.meta).await?;

        if target_url.is_none() && clicks.is_none() && raw_log.is_empty() && raw_meta.is_none() {
            warn!("No stats found for short code: {}", code);
            return Ok(None);
        }

        let click_count = clicks
            .map(|v| decode_count(&keys.clicks, &v))
            .transpose()?
            .unwrap_or(0);
        let click_log = raw_log
            .iter()
            .map(|entry| decode_timestamp(&keys.click_log, entry))
            .collect::<RegistryResult<Vec<_>>>()?;
        let metadata = raw_meta
            .map(|v| decode_metadata(&keys.meta, &v))
            .transpose()?;
        let target_url = target_url.or_else(|| metadata.as_ref().map(|m| m.target_url.clone()));

        info!("Retrieved stats for {}: {} clicks", code, click_count);

        Ok(Some(LinkStats {
            code: code.to_string(),
            target_url,
            click_count,
            click_log,
            metadata,
        }))
    }

    /// Every live short link. Order is whatever the store enumerates.
    pub async fn list_all(&self) -> RegistryResult<Vec<LinkSummary>> {
        info!("Retrieving all short URLs");

        let mut conn = self.storage.connect().await?;
        let url_keys = conn.keys_with_prefix(URL_PREFIX).await?;

        let mut urls = Vec::with_capacity(url_keys.len());
        for url_key in url_keys {
            let Some(code) = url_key.strip_prefix(URL_PREFIX) else {
                continue;
            };
            let keys = LinkKeys::new(code);

            // Expired or deleted since the scan
            let Some(target_url) = conn.get(&keys.url).await? else {
                debug!("Short code {} disappeared during listing", code);
                continue;
            };

            let metadata = match conn.get(&keys.meta).await? {
                Some(raw) => decode_metadata(&keys.meta, &raw)
                    .inspect_err(|err| warn!("Ignoring metadata for {}: {}", code, err))
                    .ok(),
                None => None,
            };
            let click_count = match conn.get(&keys.clicks).await? {
                Some(raw) => decode_count(&keys.clicks, &raw)
                    .inspect_err(|err| warn!("Ignoring click count for {}: {}", code, err))
                    .unwrap_or(0),
                None => 0,
            };

            urls.push(LinkSummary {
                code: code.to_string(),
                target_url,
                metadata,
                click_count,
            });
        }

        info!("Found {} short URLs", urls.len());
        Ok(urls)
    }

    /// Delete every facet of `code`.
    ///
    /// Returns `true` once the deletes were issued, whether or not anything
    /// existed under the code.
    pub async fn delete(&self, code: &str) -> RegistryResult<bool> {
        info!("Deleting short URL: {}", code);

        let keys = LinkKeys::new(code);
        let mut conn = self.storage.connect().await?;
        for key in keys.all() {
            conn.delete(key).await?;
        }

        info!("Successfully deleted short URL: {}", code);
        Ok(true)
    }
}

/// Whole seconds from `now` until `expires_at`, rounded up
fn ttl_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0)
}

/// Click log entries are Unix timestamps in fractional seconds
fn encode_timestamp(at: DateTime<Utc>) -> String {
    format!("{:.6}", at.timestamp_micros() as f64 / 1_000_000.0)
}

fn decode_timestamp(key: &str, raw: &str) -> RegistryResult<DateTime<Utc>> {
    let corrupt = |reason: &str| RegistryError::Corrupt {
        key: key.to_string(),
        reason: format!("{reason}: {raw:?}"),
    };

    let secs = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| corrupt("not a timestamp"))?;
    if !secs.is_finite() {
        return Err(corrupt("not a timestamp"));
    }

    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
        .ok_or_else(|| corrupt("timestamp out of range"))
}

fn decode_count(key: &str, raw: &str) -> RegistryResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| RegistryError::Corrupt {
            key: key.to_string(),
            reason: format!("not a click count: {raw:?}"),
        })
}

fn decode_metadata(key: &str, raw: &str) -> RegistryResult<LinkMetadata> {
    serde_json::from_str(raw).map_err(|e| RegistryError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
