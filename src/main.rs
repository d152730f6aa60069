use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use suspense_cache::{CacheConfig, ExpiringResourceCache, ReadError};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize)]
struct Creature {
    name: String,
    number: u32,
    kind: String,
}

#[derive(Debug, Clone, thiserror::Error)]
enum LookupError {
    #[error("no creature named {0:?}")]
    UnknownName(String),
}

const DEX: [(&str, u32, &str); 4] = [
    ("pikachu", 25, "electric"),
    ("bulbasaur", 1, "grass"),
    ("charmander", 4, "fire"),
    ("squirtle", 7, "water"),
];

// Stands in for a slow remote lookup.
async fn lookup_creature(name: String) -> Result<Creature, LookupError> {
    let latency = rand::thread_rng().gen_range(100..400);
    sleep(Duration::from_millis(latency)).await;

    DEX.iter()
        .find(|(known, _, _)| *known == name)
        .map(|(known, number, kind)| Creature {
            name: known.to_string(),
            number: *number,
            kind: kind.to_string(),
        })
        .ok_or(LookupError::UnknownName(name))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CacheConfig::from_path(Path::new(&path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => CacheConfig::new(Duration::from_millis(1500), Duration::from_millis(500)),
    };
    info!("Using config: {:?}", config);

    let cache = ExpiringResourceCache::new(config, lookup_creature)?;

    // Several consumers ask for the same creature before the lookup finishes.
    let handles = (0..3)
        .map(|_| cache.get_or_create("pikachu"))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "Issued {} requests, resource pending: {}",
        handles.len(),
        handles[0].is_pending()
    );
    for outcome in join_all(handles.iter().map(|handle| handle.settled())).await {
        info!("Read: {}", serde_json::to_string(&outcome?)?);
    }
    info!("After shared requests: {}", cache.report_metrics());

    let missing = cache.get_or_create("missingno")?;
    match missing.settled().await {
        Err(ReadError::Failed(e)) => warn!("Lookup failed: {}", e),
        other => warn!("Unexpected outcome: {:?}", other),
    }

    if let Err(e) = cache.get_or_create("") {
        warn!("Rejected request: {}", e);
    }

    let wait = config.ttl + config.sweep_interval * 2;
    info!("Waiting {:?} for the sweep to evict idle entries", wait);
    sleep(wait).await;
    info!("Entries left after sweep: {}", cache.len());

    let refetched = cache.get_or_create("pikachu")?;
    info!(
        "Re-requested pikachu, new resource: {}",
        !refetched.ptr_eq(&handles[0])
    );
    info!("Read: {:?}", refetched.settled().await?);
    // The handle from before eviction still reads its old value.
    info!("Old handle still reads: {:?}", handles[0].read()?);

    info!("Final metrics: {}", cache.report_metrics());
    cache.shutdown().await;
    Ok(())
}
