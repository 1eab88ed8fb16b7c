//! Minimal embedding example for listsync-core
//!
//! This example demonstrates using listsync-core as a library in a custom
//! application, with an in-process container service standing in for the
//! remote API. It walks through the cache gate: first add goes remote,
//! re-add is served from the cache, a batch sends only its uncached
//! remainder.

use listsync_core::traits::{
    ContainerInfo, ContainerKind, ContainerService, IpRange, MutationReceipt,
};
use listsync_core::{ContainerEngine, Result, ValueCache};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory container service for embedded usage
///
/// Tracks container membership in process memory and counts how often the
/// "remote" side is actually called, so the demo can show the gate working.
#[derive(Default)]
struct EmbeddedService {
    containers: Mutex<BTreeMap<String, BTreeSet<String>>>,
    remote_calls: AtomicUsize,
}

impl EmbeddedService {
    fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn mutate(
        &self,
        container: &str,
        values: Vec<String>,
        insert: bool,
    ) -> MutationReceipt {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        let mut containers = self.containers.lock().unwrap();
        let members = containers.entry(container.to_string()).or_default();
        for value in values {
            if insert {
                members.insert(value);
            } else {
                members.remove(&value);
            }
        }
        MutationReceipt {
            container: container.to_string(),
            reported_size: Some(members.len() as u64),
        }
    }
}

#[async_trait::async_trait]
impl ContainerService for EmbeddedService {
    async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo> {
        let receipt = self.mutate(name, initial.iter().map(|r| r.to_string()).collect(), true);
        Ok(ContainerInfo {
            name: name.to_string(),
            kind: ContainerKind::Ip,
            size: receipt.reported_size.unwrap_or(0),
            description: Some(description.to_string()),
        })
    }

    async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo> {
        let receipt = self.mutate(name, initial.to_vec(), true);
        Ok(ContainerInfo {
            name: name.to_string(),
            kind: ContainerKind::Fqdn,
            size: receipt.reported_size.unwrap_or(0),
            description: Some(description.to_string()),
        })
    }

    async fn add_ip_ranges(&self, container: &str, ranges: &[IpRange]) -> Result<MutationReceipt> {
        Ok(self.mutate(container, ranges.iter().map(|r| r.to_string()).collect(), true))
    }

    async fn remove_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt> {
        Ok(self.mutate(container, ranges.iter().map(|r| r.to_string()).collect(), false))
    }

    async fn add_fqdns(&self, container: &str, fqdns: &[String]) -> Result<MutationReceipt> {
        Ok(self.mutate(container, fqdns.to_vec(), true))
    }

    async fn remove_fqdns(&self, container: &str, fqdns: &[String]) -> Result<MutationReceipt> {
        Ok(self.mutate(container, fqdns.to_vec(), false))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .iter()
            .map(|(name, members)| ContainerInfo {
                name: name.clone(),
                kind: ContainerKind::Fqdn,
                size: members.len() as u64,
                description: None,
            })
            .collect())
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        self.containers.lock().unwrap().remove(name);
        Ok(())
    }

    fn service_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    // A fresh store file under the system temp dir for each run
    let store_path = std::env::temp_dir().join("listsync-embedded-demo.db");
    let _ = std::fs::remove_file(&store_path);
    let cache = ValueCache::open(&store_path).await?;

    let service = std::sync::Arc::new(EmbeddedService::default());
    let engine = ContainerEngine::with_cache(Box::new(service.clone()), Some(cache));

    let range = IpRange::new("10.0.0.1".parse()?, "10.0.0.10".parse()?);

    println!("--- first add: goes to the remote service");
    let outcome = engine.add_ip_range("edge-allow", &range).await?;
    println!("outcome: {}", serde_json::to_string(&outcome)?);
    println!("remote calls so far: {}", service.remote_calls());

    println!("--- second add of the same range: cache hit, no remote call");
    let outcome = engine.add_ip_range("edge-allow", &range).await?;
    println!("outcome: {}", serde_json::to_string(&outcome)?);
    println!("remote calls so far: {}", service.remote_calls());

    println!("--- batch add with one new value: only the remainder is sent");
    engine
        .add_fqdns("blocklist", &["a.example.com".to_string()])
        .await?;
    let outcome = engine
        .add_fqdns(
            "blocklist",
            &["a.example.com".to_string(), "b.example.com".to_string()],
        )
        .await?;
    println!("outcome: {}", serde_json::to_string(&outcome)?);

    println!("--- validation against the embedded listing");
    let report = engine.validate(false).await?;
    println!("status: {}", serde_json::to_string(&report.status)?);

    println!("--- removal is always remote, and evicts the cache row");
    let outcome = engine.remove_ip_range("edge-allow", &range).await?;
    println!("outcome: {}", serde_json::to_string(&outcome)?);

    Ok(())
}
