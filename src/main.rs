//! Mini Cache - demo binary
//!
//! Exercises the cache engine end to end and prints its statistics.

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{spawn_expiry_task, Cache, Config};

/// Entry point for the Mini Cache demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and start the TTL expiry task
/// 4. Run a handful of operations, including rejected ones
/// 5. Wait for a TTL entry to expire and print statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Cache demo");

    let config = Config::from_env();
    info!(max_memory = config.max_memory, "Configuration loaded");

    let cache: Cache<String> = Cache::from_config(&config);
    let expiry_handle = spawn_expiry_task(cache.clone());

    cache.set("greeting", "hello".to_string(), None)?;
    cache.set("session", "abc123".to_string(), Some(Duration::from_millis(200)))?;

    if let Err(err) = cache.set("greeting", "bonjour".to_string(), None) {
        warn!(error = %err, "Duplicate insert refused");
    }

    cache.set_max_memory("1KB")?;
    if let Err(err) = cache.set("large", "x".repeat(4096), None) {
        warn!(error = %err, "Oversized insert refused");
    }
    if let Err(err) = cache.set_max_memory("plenty") {
        warn!(error = %err, "Budget unchanged");
    }

    info!(
        keys = cache.keys(),
        used_memory = cache.used_memory(),
        session_ttl = ?cache.ttl_remaining("session"),
        "Cache populated"
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    info!(
        session_exists = cache.exists("session"),
        keys = cache.keys(),
        "After session TTL"
    );

    let removed = cache.flush();
    info!(removed, "Cache flushed");

    println!("{}", serde_json::to_string_pretty(&cache.stats())?);

    expiry_handle.abort();
    info!("Demo complete");
    Ok(())
}
