use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::registry::{RegistryConfig, DEFAULT_CLICK_LOG_CAP, DEFAULT_TTL_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    /// Prefix of generated short links, e.g. `https://sho.rt`
    pub base_url: String,
    pub default_ttl_secs: i64,
    pub click_log_cap: usize,
    pub redirect_status: RedirectMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Namespace prepended to every key (Redis only)
    #[serde(default)]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    /// 307 Temporary Redirect; clients come back so every click is counted
    #[default]
    Temporary,
    /// 308 Permanent Redirect
    Permanent,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "redis".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown STORE_BACKEND '{other}', falling back to 'redis'. Supported values: redis, memory"
                );
                StoreBackend::Redis
            }
        };

        let store_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix = std::env::var("STORE_KEY_PREFIX").unwrap_or_default();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let default_ttl_secs = match std::env::var("DEFAULT_TTL_SECS") {
            Ok(v) => v
                .parse::<i64>()
                .context("DEFAULT_TTL_SECS must be an integer")?,
            Err(_) => DEFAULT_TTL_SECS,
        };
        if default_ttl_secs <= 0 {
            anyhow::bail!("DEFAULT_TTL_SECS must be positive, got {default_ttl_secs}");
        }

        let click_log_cap = match std::env::var("CLICK_LOG_CAP") {
            Ok(v) => v
                .parse::<usize>()
                .context("CLICK_LOG_CAP must be a non-negative integer")?,
            Err(_) => DEFAULT_CLICK_LOG_CAP,
        };
        if click_log_cap == 0 {
            anyhow::bail!("CLICK_LOG_CAP must be at least 1");
        }

        let redirect_status = match std::env::var("REDIRECT_STATUS")
            .unwrap_or_else(|_| "temporary".to_string())
            .to_lowercase()
            .as_str()
        {
            "temporary" | "307" => RedirectMode::Temporary,
            "permanent" | "308" => RedirectMode::Permanent,
            other => {
                tracing::warn!(
                    "Unknown REDIRECT_STATUS '{other}', falling back to 'temporary'. Supported values: temporary, permanent"
                );
                RedirectMode::Temporary
            }
        };

        Ok(Config {
            store: StoreConfig {
                backend,
                url: store_url,
                key_prefix,
            },
            server: ServerConfig { host, port },
            base_url,
            default_ttl_secs,
            click_log_cap,
            redirect_status,
        })
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            base_url: self.base_url.clone(),
            default_ttl_secs: self.default_ttl_secs,
            click_log_cap: self.click_log_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_mirrors_settings() {
        let config = Config {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: String::new(),
                key_prefix: String::new(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            base_url: "https://sho.rt".to_string(),
            default_ttl_secs: 60,
            click_log_cap: 10,
            redirect_status: RedirectMode::default(),
        };

        let registry = config.registry_config();
        assert_eq!(registry.base_url, "https://sho.rt");
        assert_eq!(registry.default_ttl_secs, 60);
        assert_eq!(registry.click_log_cap, 10);
    }

    #[test]
    fn test_redirect_mode_deserializes_lowercase() {
        let mode: RedirectMode = serde_json::from_str("\"permanent\"").unwrap();
        assert_eq!(mode, RedirectMode::Permanent);
        assert_eq!(RedirectMode::default(), RedirectMode::Temporary);
    }
}
