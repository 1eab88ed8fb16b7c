//! Registry-level reconciliation of cache state against the remote service
//!
//! The remote service reports only aggregate container sizes; there is no
//! endpoint to enumerate a container's member values. Reconciliation is
//! therefore registry-level by design: it answers "is my local bookkeeping
//! of which containers exist and how big they are still correct", through
//! three checks over the remote listing and the cached registry snapshot:
//!
//! 1. remote containers missing from the cache
//! 2. cached containers missing from the remote account (orphans)
//! 3. size disagreement for containers present on both sides
//!
//! A value removed from a container out-of-band cannot be detected here
//! without deleting the whole container; that coverage gap is a limitation
//! of the remote interface, not of this module. [`ValueCache::purge_stale`]
//! is the pressure valve for entries that are never re-confirmed.
//!
//! [`ValueCache::purge_stale`]: crate::cache::ValueCache::purge_stale

use serde::Serialize;
use std::collections::BTreeSet;

use crate::cache::ContainerRecord;
use crate::traits::{ContainerInfo, ContainerKind};

/// Overall outcome of a validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    /// All three checks came back empty
    Pass,
    /// At least one discrepancy was found
    Fail,
}

/// A remote container with no registry metadata in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingContainer {
    /// Container name
    pub name: String,
    /// Kind reported by the remote service
    pub kind: ContainerKind,
    /// Size reported by the remote service
    pub size: u64,
}

/// A cached container absent from the remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedContainer {
    /// Container name
    pub name: String,
    /// Kind recorded in the cache
    pub kind: ContainerKind,
    /// Last size the remote service reported, as cached
    pub reported_size: Option<u64>,
}

/// A container whose cached size disagrees with the remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeMismatch {
    /// Container name
    pub name: String,
    /// Kind reported by the remote service
    pub kind: ContainerKind,
    /// Size reported by the remote listing
    pub remote_size: u64,
    /// Size recorded in the cache (0 when never reported)
    pub cached_size: u64,
    /// `remote_size - cached_size`
    pub difference: i64,
}

/// One failed orphan repair during an auto-fix pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixFailure {
    /// Container whose cache state could not be cleared
    pub container: String,
    /// The error, rendered
    pub error: String,
}

/// Result of one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// When the pass ran
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Containers in the remote listing
    pub remote_containers: usize,
    /// Containers with registry metadata in the cache
    pub cached_containers: usize,
    /// Containers present on both sides (size-checked)
    pub validated: usize,
    /// Check 1: remote containers not tracked locally
    pub missing_in_cache: Vec<MissingContainer>,
    /// Check 2: cached containers gone from the remote account
    pub orphaned: Vec<OrphanedContainer>,
    /// Check 3: size disagreements
    pub size_mismatches: Vec<SizeMismatch>,
    /// Overall status; Pass iff every check is empty
    pub status: ValidationStatus,
    /// Orphans whose cache state was cleared by auto-fix
    pub repaired: Vec<String>,
    /// Orphans whose auto-fix repair failed
    pub fix_failures: Vec<FixFailure>,
}

impl ValidationReport {
    /// Whether every check came back clean
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }
}

/// Cross-reference a remote container listing against the cached registry
///
/// Pure comparison; repairs (and their outcomes) are layered on by the
/// engine. The status reflects what was found, not what was fixed.
pub fn compare(remote: &[ContainerInfo], cached: &[ContainerRecord]) -> ValidationReport {
    let remote_names: BTreeSet<&str> = remote.iter().map(|c| c.name.as_str()).collect();
    let cached_names: BTreeSet<&str> = cached.iter().map(|r| r.name.as_str()).collect();

    let missing_in_cache: Vec<MissingContainer> = remote
        .iter()
        .filter(|c| !cached_names.contains(c.name.as_str()))
        .map(|c| MissingContainer {
            name: c.name.clone(),
            kind: c.kind.clone(),
            size: c.size,
        })
        .collect();

    let orphaned: Vec<OrphanedContainer> = cached
        .iter()
        .filter(|r| !remote_names.contains(r.name.as_str()))
        .map(|r| OrphanedContainer {
            name: r.name.clone(),
            kind: r.kind.clone(),
            reported_size: r.reported_size,
        })
        .collect();

    let mut validated = 0;
    let mut size_mismatches = Vec::new();
    for info in remote {
        let Some(record) = cached.iter().find(|r| r.name == info.name) else {
            continue;
        };
        validated += 1;
        // A registry row that never saw a reported size counts as 0, so a
        // non-empty remote container still surfaces as a mismatch.
        let cached_size = record.reported_size.unwrap_or(0);
        if cached_size != info.size {
            size_mismatches.push(SizeMismatch {
                name: info.name.clone(),
                kind: info.kind.clone(),
                remote_size: info.size,
                cached_size,
                difference: info.size as i64 - cached_size as i64,
            });
        }
    }

    let status = if missing_in_cache.is_empty() && orphaned.is_empty() && size_mismatches.is_empty()
    {
        ValidationStatus::Pass
    } else {
        ValidationStatus::Fail
    };

    ValidationReport {
        generated_at: chrono::Utc::now(),
        remote_containers: remote.len(),
        cached_containers: cached.len(),
        validated,
        missing_in_cache,
        orphaned,
        size_mismatches,
        status,
        repaired: Vec::new(),
        fix_failures: Vec::new(),
    }
}
