//! Cache maintenance walkthrough
//!
//! Exercises the local store directly: seeding entries, inspecting stats,
//! purging by staleness, and clearing a container. No remote service is
//! involved; these are the operations an operator runs to keep a
//! long-lived cache file healthy.

use listsync_core::traits::{ContainerKind, IpRange};
use listsync_core::{CacheStats, ValueCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let store_path = std::env::temp_dir().join("listsync-maintenance-demo.db");
    let _ = std::fs::remove_file(&store_path);
    let cache = ValueCache::open(&store_path).await?;

    println!("--- seeding entries");
    let range = IpRange::new("192.0.2.1".parse()?, "192.0.2.100".parse()?);
    cache.upsert_ip_range("edge-allow", &range).await?;
    cache.upsert_fqdn("blocklist", "bad.example.com").await?;
    cache.upsert_fqdn("blocklist", "worse.example.com").await?;
    cache
        .upsert_container("blocklist", &ContainerKind::Fqdn, Some(2))
        .await?;

    println!("--- store-wide stats");
    if let CacheStats::Global(stats) = cache.stats(None).await? {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    println!("--- per-container stats");
    if let CacheStats::Container(stats) = cache.stats(Some("blocklist")).await? {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    println!("--- purge with a 30-day threshold removes nothing fresh");
    let summary = cache.purge_stale("blocklist", 30).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    println!("--- a zero-day threshold drops entries older than this instant");
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let summary = cache.purge_stale("blocklist", 0).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    println!("--- clearing the remaining container");
    let (ips, fqdns) = cache.clear_container("edge-allow").await?;
    println!("removed {ips} ip ranges, {fqdns} fqdns");

    Ok(())
}
