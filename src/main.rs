use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use clickvault::config::{Config, StoreBackend};
use clickvault::registry::UrlRegistry;
use clickvault::storage::{MemoryStorage, RedisStorage, Storage};
use clickvault::{app, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.store.backend {
        StoreBackend::Redis => {
            info!("Using Redis store: {}", config.store.url);
            Arc::new(RedisStorage::new(&config.store.url, &config.store.key_prefix)?)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store (data is lost on restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    // Fail fast if the store is unreachable
    storage.ping().await?;
    info!("Store connection verified");

    let registry = Arc::new(UrlRegistry::new(storage, config.registry_config()));
    let router = app::create_app(registry, config.redirect_status);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/urls/...", addr);
    info!("   - Short links resolve at {}/s/{{code}}", config.base_url);

    axum::serve(listener, router).await?;

    Ok(())
}
