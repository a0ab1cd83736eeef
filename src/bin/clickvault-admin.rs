use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clickvault::config::{Config, StoreBackend};
use clickvault::registry::UrlRegistry;
use clickvault::storage::{MemoryStorage, RedisStorage, Storage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "clickvault-admin")]
#[command(about = "clickvault short link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a short link
    Create {
        /// Target URL
        url: String,
        /// Use this code instead of generating one (overwrites an existing link)
        #[arg(long)]
        code: Option<String>,
        /// Expiry as an RFC 3339 timestamp, e.g. 2030-01-01T00:00:00Z
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Resolve a code to its target (counts as a click)
    Resolve {
        code: String,
    },
    /// Show click statistics for a code
    Stats {
        code: String,
    },
    /// List all live short links
    List,
    /// Delete a short link and its statistics
    Delete {
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.store.backend {
        StoreBackend::Redis => Arc::new(RedisStorage::new(
            &config.store.url,
            &config.store.key_prefix,
        )?),
        StoreBackend::Memory => {
            tracing::warn!("STORE_BACKEND=memory: changes are discarded when this command exits");
            Arc::new(MemoryStorage::new())
        }
    };

    let registry = UrlRegistry::new(storage, config.registry_config());

    match cli.command {
        Commands::Create {
            url,
            code,
            expires_at,
        } => {
            let link = registry
                .create(&url, code.as_deref(), expires_at)
                .await
                .context("failed to create short link")?;
            println!("✓ {} -> {}", link.short_url, link.target_url);
        }
        Commands::Resolve { code } => match registry.resolve(&code).await? {
            Some(target) => println!("{}", target),
            None => anyhow::bail!("short code '{}' not found", code),
        },
        Commands::Stats { code } => {
            let Some(stats) = registry.get_stats(&code).await? else {
                anyhow::bail!("no statistics for short code '{}'", code);
            };
            println!("Code:       {}", stats.code);
            println!(
                "Target:     {}",
                stats.target_url.as_deref().unwrap_or("(expired)")
            );
            if let Some(meta) = &stats.metadata {
                println!("Created at: {}", meta.created_at.to_rfc3339());
                match meta.expires_at {
                    Some(at) => println!("Expires at: {}", at.to_rfc3339()),
                    None => println!("Expires at: (default retention)"),
                }
            }
            println!("Clicks:     {}", stats.click_count);
            for at in &stats.click_log {
                println!("  {}", at.to_rfc3339());
            }
        }
        Commands::List => {
            let urls = registry.list_all().await?;
            if urls.is_empty() {
                println!("No short links found.");
            } else {
                println!("{:<20} {:<8} {}", "Code", "Clicks", "Target");
                println!("{}", "-".repeat(80));
                for link in urls {
                    println!("{:<20} {:<8} {}", link.code, link.click_count, link.target_url);
                }
            }
        }
        Commands::Delete { code } => {
            registry.delete(&code).await?;
            println!("✓ Deleted short link '{}'", code);
        }
    }

    Ok(())
}
