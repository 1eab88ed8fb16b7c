//! Test doubles and common utilities for contract tests
//!
//! This module provides a scriptable ContainerService double that records
//! every call, so tests can assert exactly which values crossed the wire.

use listsync_core::error::Result;
use listsync_core::traits::{
    ContainerInfo, ContainerKind, ContainerService, IpRange, MutationReceipt,
};
use listsync_core::{Error, ValueCache};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A mock ContainerService that records calls and can be scripted to fail
pub struct MockContainerService {
    /// Call counter for the add methods
    add_call_count: Arc<AtomicUsize>,
    /// Call counter for the remove methods
    remove_call_count: Arc<AtomicUsize>,
    /// Call counter for list_containers()
    list_call_count: Arc<AtomicUsize>,
    /// Call counter for delete_container()
    delete_call_count: Arc<AtomicUsize>,
    /// Values sent by each add call, stringified, in call order
    sent_batches: Arc<std::sync::Mutex<Vec<Vec<String>>>>,
    /// Size reported in mutation receipts
    reported_size: Arc<std::sync::Mutex<Option<u64>>>,
    /// Listing returned by list_containers()
    listing: Arc<std::sync::Mutex<Vec<ContainerInfo>>>,
    /// When set, every mutation fails with RemoteRejected
    fail_mutations: Arc<AtomicBool>,
}

impl MockContainerService {
    pub fn new() -> Self {
        Self {
            add_call_count: Arc::new(AtomicUsize::new(0)),
            remove_call_count: Arc::new(AtomicUsize::new(0)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            delete_call_count: Arc::new(AtomicUsize::new(0)),
            sent_batches: Arc::new(std::sync::Mutex::new(Vec::new())),
            reported_size: Arc::new(std::sync::Mutex::new(Some(1))),
            listing: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_mutations: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new MockContainerService that shares counters with an
    /// existing one (for handing a Box to the engine while keeping a probe)
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            add_call_count: Arc::clone(&other.add_call_count),
            remove_call_count: Arc::clone(&other.remove_call_count),
            list_call_count: Arc::clone(&other.list_call_count),
            delete_call_count: Arc::clone(&other.delete_call_count),
            sent_batches: Arc::clone(&other.sent_batches),
            reported_size: Arc::clone(&other.reported_size),
            listing: Arc::clone(&other.listing),
            fail_mutations: Arc::clone(&other.fail_mutations),
        }
    }

    pub fn add_call_count(&self) -> usize {
        self.add_call_count.load(Ordering::SeqCst)
    }

    pub fn remove_call_count(&self) -> usize {
        self.remove_call_count.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    /// Values sent by each add call, in call order
    pub fn sent_batches(&self) -> Vec<Vec<String>> {
        self.sent_batches.lock().unwrap().clone()
    }

    /// Script the size reported in mutation receipts
    pub fn set_reported_size(&self, size: Option<u64>) {
        *self.reported_size.lock().unwrap() = size;
    }

    /// Script the container listing
    pub fn set_listing(&self, listing: Vec<ContainerInfo>) {
        *self.listing.lock().unwrap() = listing;
    }

    /// Make every subsequent mutation fail with RemoteRejected
    pub fn set_failing(&self, failing: bool) {
        self.fail_mutations.store(failing, Ordering::SeqCst);
    }

    fn mutation_gate(&self) -> Result<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(Error::remote_rejected(
                "scripted failure",
                serde_json::json!([{ "message": "scripted failure" }]),
            ))
        } else {
            Ok(())
        }
    }

    fn receipt(&self, container: &str) -> MutationReceipt {
        MutationReceipt {
            container: container.to_string(),
            reported_size: *self.reported_size.lock().unwrap(),
        }
    }

    fn record_batch(&self, values: Vec<String>) {
        self.sent_batches.lock().unwrap().push(values);
    }
}

#[async_trait::async_trait]
impl ContainerService for MockContainerService {
    async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo> {
        self.mutation_gate()?;
        Ok(ContainerInfo {
            name: name.to_string(),
            kind: ContainerKind::Ip,
            size: initial.len() as u64,
            description: Some(description.to_string()),
        })
    }

    async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo> {
        self.mutation_gate()?;
        Ok(ContainerInfo {
            name: name.to_string(),
            kind: ContainerKind::Fqdn,
            size: initial.len() as u64,
            description: Some(description.to_string()),
        })
    }

    async fn add_ip_ranges(&self, container: &str, ranges: &[IpRange]) -> Result<MutationReceipt> {
        self.add_call_count.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate()?;
        self.record_batch(ranges.iter().map(|r| r.to_string()).collect());
        Ok(self.receipt(container))
    }

    async fn remove_ip_ranges(
        &self,
        container: &str,
        _ranges: &[IpRange],
    ) -> Result<MutationReceipt> {
        self.remove_call_count.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate()?;
        Ok(self.receipt(container))
    }

    async fn add_fqdns(&self, container: &str, fqdns: &[String]) -> Result<MutationReceipt> {
        self.add_call_count.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate()?;
        self.record_batch(fqdns.to_vec());
        Ok(self.receipt(container))
    }

    async fn remove_fqdns(&self, container: &str, _fqdns: &[String]) -> Result<MutationReceipt> {
        self.remove_call_count.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate()?;
        Ok(self.receipt(container))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn delete_container(&self, _name: &str) -> Result<()> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate()?;
        Ok(())
    }

    fn service_name(&self) -> &'static str {
        "mock"
    }
}

/// Open a ValueCache on a fresh temp file; the TempDir must stay alive for
/// the duration of the test
pub async fn temp_cache() -> (tempfile::TempDir, ValueCache) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cache = ValueCache::open(dir.path().join("cache.db"))
        .await
        .expect("open cache store");
    (dir, cache)
}

/// Parse helper for test IP ranges
pub fn range(from: &str, to: &str) -> IpRange {
    IpRange::new(from.parse().unwrap(), to.parse().unwrap())
}

/// Container listing entry helper
pub fn info(name: &str, kind: ContainerKind, size: u64) -> ContainerInfo {
    ContainerInfo {
        name: name.to_string(),
        kind,
        size,
        description: None,
    }
}
