//! Core container sync engine
//!
//! The ContainerEngine wraps every remote mutation in a cache gate:
//!
//! - **Adds** consult the local cache first. Values already known to be
//!   present are only touched (timestamp refresh) and never re-sent; for a
//!   batch, exactly the uncached remainder goes over the wire, and a fully
//!   cached batch makes no remote call at all.
//! - **Removes** always go to the remote service first (the cache is never
//!   authoritative for deletion), then evict matching cache rows.
//! - **Local writes happen only after confirmed remote success**, so a
//!   failed mutation leaves no phantom cache state.
//!
//! ## Flow
//!
//! ```text
//!  caller ──add──▶ ┌─────────────────┐        ┌──────────────────┐
//!                  │ ContainerEngine │──miss─▶│ ContainerService │
//!                  └─────────────────┘        └──────────────────┘
//!                       │      ▲ hit: touch + synthetic success      │
//!                       ▼      │                                     │
//!                  ┌─────────────────┐ ◀──── upsert on success ──────┘
//!                  │   ValueCache    │
//!                  └─────────────────┘
//! ```
//!
//! The engine performs one operation at a time, spawns no tasks, and never
//! retries; retry policy belongs to callers or the service implementation.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ClearSummary, FqdnEntry, IpRangeEntry, PurgeSummary, ValueCache};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::reconcile::{self, ValidationReport};
use crate::traits::{ContainerInfo, ContainerKind, ContainerService, IpRange};

/// Result of a gated add operation
///
/// Callers branch on the variant, not on payload shape: a `CacheHit`
/// carries no remote data because no remote call was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    /// Every requested value was already cached; the remote service was
    /// not contacted
    CacheHit {
        /// Container the values belong to
        container: String,
    },
    /// The remote service performed the mutation
    Remote {
        /// Container the values belong to
        container: String,
        /// Aggregate size the service reported, if any
        reported_size: Option<u64>,
    },
}

impl AddOutcome {
    /// Whether the add was satisfied entirely from the cache
    pub fn was_cached(&self) -> bool {
        matches!(self, AddOutcome::CacheHit { .. })
    }
}

/// Result of a remove operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveOutcome {
    /// Container the values were removed from
    pub container: String,
    /// Aggregate size the service reported, if any
    pub reported_size: Option<u64>,
    /// How many of the requested values were present in the cache and
    /// evicted by this call
    pub evicted: u64,
}

/// Cached values for one container, both kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedValues {
    /// Container name
    pub container: String,
    /// Kind recorded in the registry, when known
    pub kind: Option<ContainerKind>,
    /// Cached IP ranges, most recently seen first
    pub ip_ranges: Vec<IpRangeEntry>,
    /// Cached FQDNs, most recently seen first
    pub fqdns: Vec<FqdnEntry>,
}

/// A remote container listing entry, augmented with local cache state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerListing {
    /// Metadata as reported by the remote service
    #[serde(flatten)]
    pub info: ContainerInfo,
    /// Local cache statistics for this container, when the cache is
    /// enabled and readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<crate::cache::ContainerCacheStats>,
}

/// Core container sync engine
///
/// Owns the remote service handle and, when enabled, the cache store. No
/// ambient globals: several engines may coexist in one process as long as
/// they point at different store files.
///
/// ## Lifecycle
///
/// 1. Create with [`ContainerEngine::new()`] (opens the store) or
///    [`ContainerEngine::with_cache()`] (injects one)
/// 2. Invoke operations; each blocks until its remote/local work completes
/// 3. Drop to release the store handle
pub struct ContainerEngine {
    /// Remote container service (authoritative side)
    service: Box<dyn ContainerService>,

    /// Local membership cache; `None` means every gate is pass-through and
    /// cache-only operations fail with `CacheDisabled`
    cache: Option<ValueCache>,
}

impl ContainerEngine {
    /// Create an engine from configuration, opening the cache store if
    /// caching is enabled
    pub async fn new(service: Box<dyn ContainerService>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let cache = if config.cache.enabled {
            let path = config.cache.resolve_path()?;
            Some(ValueCache::open(path).await?)
        } else {
            None
        };
        Ok(Self::with_cache(service, cache))
    }

    /// Create an engine around an existing cache handle (or none)
    pub fn with_cache(service: Box<dyn ContainerService>, cache: Option<ValueCache>) -> Self {
        Self { service, cache }
    }

    /// Whether this engine has a cache store
    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// The cache handle, when enabled
    pub fn cache(&self) -> Option<&ValueCache> {
        self.cache.as_ref()
    }

    fn require_cache(&self) -> Result<&ValueCache> {
        self.cache.as_ref().ok_or(Error::CacheDisabled)
    }

    //
    // Cache lookups
    //

    /// Whether an IP range is cached for a container
    pub async fn has_ip_range(&self, container: &str, range: &IpRange) -> Result<bool> {
        self.require_cache()?.has_ip_range(container, range).await
    }

    /// Whether an FQDN is cached for a container
    pub async fn has_fqdn(&self, container: &str, fqdn: &str) -> Result<bool> {
        self.require_cache()?.has_fqdn(container, fqdn).await
    }

    //
    // Gated mutations
    //

    /// Add one IP range to a container, skipping the remote call when the
    /// range is already cached
    pub async fn add_ip_range(&self, container: &str, range: &IpRange) -> Result<AddOutcome> {
        if let Some(cache) = &self.cache {
            if cache.has_ip_range(container, range).await? {
                cache.touch_ip_range(container, range).await?;
                debug!(container, %range, "ip range already cached, skipping remote call");
                return Ok(AddOutcome::CacheHit {
                    container: container.to_string(),
                });
            }
        }

        let receipt = self
            .service
            .add_ip_ranges(container, std::slice::from_ref(range))
            .await?;
        info!(container, %range, size = ?receipt.reported_size, "added ip range");

        if let Some(cache) = &self.cache {
            cache.upsert_ip_range(container, range).await?;
            if let Some(size) = receipt.reported_size {
                cache
                    .upsert_container(container, &ContainerKind::Ip, Some(size))
                    .await?;
            }
        }

        Ok(AddOutcome::Remote {
            container: receipt.container,
            reported_size: receipt.reported_size,
        })
    }

    /// Add a batch of FQDNs to a container, sending only the uncached
    /// remainder to the remote service
    ///
    /// The remote batch is all-or-nothing, so cache rows for the new
    /// values are written only after the whole batch succeeds.
    pub async fn add_fqdns(&self, container: &str, fqdns: &[String]) -> Result<AddOutcome> {
        let mut misses: Vec<String> = Vec::with_capacity(fqdns.len());

        if let Some(cache) = &self.cache {
            let mut hits = 0usize;
            for fqdn in fqdns {
                if cache.has_fqdn(container, fqdn).await? {
                    cache.touch_fqdn(container, fqdn).await?;
                    hits += 1;
                } else {
                    misses.push(fqdn.clone());
                }
            }

            if hits > 0 {
                debug!(container, hits, misses = misses.len(), "fqdn batch partitioned");
            }

            if misses.is_empty() {
                debug!(container, "all fqdns already cached, skipping remote call");
                return Ok(AddOutcome::CacheHit {
                    container: container.to_string(),
                });
            }
        } else {
            misses.extend(fqdns.iter().cloned());
        }

        let receipt = self.service.add_fqdns(container, &misses).await?;
        info!(
            container,
            added = misses.len(),
            size = ?receipt.reported_size,
            "added fqdns"
        );

        if let Some(cache) = &self.cache {
            for fqdn in &misses {
                cache.upsert_fqdn(container, fqdn).await?;
            }
            if let Some(size) = receipt.reported_size {
                cache
                    .upsert_container(container, &ContainerKind::Fqdn, Some(size))
                    .await?;
            }
        }

        Ok(AddOutcome::Remote {
            container: receipt.container,
            reported_size: receipt.reported_size,
        })
    }

    /// Remove one IP range from a container
    ///
    /// The remote service is called unconditionally: a stale cache miss
    /// must not block a real removal.
    pub async fn remove_ip_range(&self, container: &str, range: &IpRange) -> Result<RemoveOutcome> {
        let receipt = self
            .service
            .remove_ip_ranges(container, std::slice::from_ref(range))
            .await?;
        info!(container, %range, "removed ip range");

        let mut evicted = 0u64;
        if let Some(cache) = &self.cache {
            if cache.remove_ip_range(container, range).await? {
                evicted = 1;
            }
            if let Some(size) = receipt.reported_size {
                cache
                    .upsert_container(container, &ContainerKind::Ip, Some(size))
                    .await?;
            }
        }

        Ok(RemoveOutcome {
            container: receipt.container,
            reported_size: receipt.reported_size,
            evicted,
        })
    }

    /// Remove a batch of FQDNs from a container
    pub async fn remove_fqdns(&self, container: &str, fqdns: &[String]) -> Result<RemoveOutcome> {
        let receipt = self.service.remove_fqdns(container, fqdns).await?;
        info!(container, count = fqdns.len(), "removed fqdns");

        let mut evicted = 0u64;
        if let Some(cache) = &self.cache {
            for fqdn in fqdns {
                if cache.remove_fqdn(container, fqdn).await? {
                    evicted += 1;
                }
            }
            if let Some(size) = receipt.reported_size {
                cache
                    .upsert_container(container, &ContainerKind::Fqdn, Some(size))
                    .await?;
            }
        }

        Ok(RemoveOutcome {
            container: receipt.container,
            reported_size: receipt.reported_size,
            evicted,
        })
    }

    //
    // Container lifecycle
    //

    /// Create an IP range container, optionally seeded with initial values
    ///
    /// Seeded values are primed into the cache so later adds of the same
    /// ranges gate correctly.
    pub async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo> {
        let info = self
            .service
            .create_ip_container(name, description, initial)
            .await?;
        info!(container = name, size = info.size, "created ip container");

        if let Some(cache) = &self.cache {
            for range in initial {
                cache.upsert_ip_range(name, range).await?;
            }
            cache
                .upsert_container(name, &ContainerKind::Ip, Some(info.size))
                .await?;
        }

        Ok(info)
    }

    /// Create an FQDN container, optionally seeded with initial values
    pub async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo> {
        let info = self
            .service
            .create_fqdn_container(name, description, initial)
            .await?;
        info!(container = name, size = info.size, "created fqdn container");

        if let Some(cache) = &self.cache {
            for fqdn in initial {
                cache.upsert_fqdn(name, fqdn).await?;
            }
            cache
                .upsert_container(name, &ContainerKind::Fqdn, Some(info.size))
                .await?;
        }

        Ok(info)
    }

    /// Delete a container remotely and clear its cache state
    ///
    /// The remote deletion is the operation of record: cache cleanup
    /// failures after a confirmed delete are logged and swallowed.
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        self.service.delete_container(name).await?;
        info!(container = name, "deleted container");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear_container(name).await {
                warn!(container = name, error = %e, "container deleted remotely but cache cleanup failed");
            }
        }

        Ok(())
    }

    /// List remote containers, augmented with local cache statistics when
    /// the cache is enabled
    ///
    /// Cache augmentation is best-effort: a failed stats lookup leaves the
    /// listing entry without cache data rather than failing the listing.
    pub async fn list_containers(&self) -> Result<Vec<ContainerListing>> {
        let infos = self.service.list_containers().await?;

        let mut listings = Vec::with_capacity(infos.len());
        for info in infos {
            let cache = match &self.cache {
                Some(cache) => match cache.stats(Some(&info.name)).await {
                    Ok(CacheStats::Container(stats)) => Some(stats),
                    Ok(CacheStats::Global(_)) => None,
                    Err(e) => {
                        warn!(container = %info.name, error = %e, "cache stats lookup failed");
                        None
                    }
                },
                None => None,
            };
            listings.push(ContainerListing { info, cache });
        }

        Ok(listings)
    }

    //
    // Cache-only operations
    //

    /// All cached values for a container with their timestamps
    ///
    /// When the registry knows the container's kind only that kind is
    /// fetched; otherwise both tables are consulted.
    pub async fn list_cached(&self, container: &str) -> Result<CachedValues> {
        let cache = self.require_cache()?;
        let kind = cache.container_kind(container).await?;

        let ip_ranges = match kind {
            Some(ContainerKind::Ip) | None => cache.ip_ranges(container).await?,
            _ => Vec::new(),
        };
        let fqdns = match kind {
            Some(ContainerKind::Fqdn) | None => cache.fqdns(container).await?,
            _ => Vec::new(),
        };

        Ok(CachedValues {
            container: container.to_string(),
            kind,
            ip_ranges,
            fqdns,
        })
    }

    /// Purge cached entries last seen more than `max_age_days` ago
    pub async fn purge_stale(&self, container: &str, max_age_days: u32) -> Result<PurgeSummary> {
        self.require_cache()?
            .purge_stale(container, max_age_days)
            .await
    }

    /// Cache statistics for one container, or for the whole store
    pub async fn stats(&self, container: Option<&str>) -> Result<CacheStats> {
        self.require_cache()?.stats(container).await
    }

    /// Drop every cached entry and registry record for a container
    ///
    /// Local-only; the remote container is untouched.
    pub async fn clear_cache(&self, container: &str) -> Result<ClearSummary> {
        let (removed_ip_ranges, removed_fqdns) =
            self.require_cache()?.clear_container(container).await?;
        Ok(ClearSummary {
            container: container.to_string(),
            removed_ip_ranges,
            removed_fqdns,
        })
    }

    //
    // Reconciliation
    //

    /// Validate the cached registry against the remote container listing
    ///
    /// Runs the three reconciliation checks; with `auto_fix`, additionally
    /// clears cache state for each orphaned container. A repair failure is
    /// recorded in the report and does not abort the remaining repairs.
    pub async fn validate(&self, auto_fix: bool) -> Result<ValidationReport> {
        let cache = self.require_cache()?;

        let remote = self.service.list_containers().await?;
        let cached = cache.container_records().await?;

        let mut report = reconcile::compare(&remote, &cached);
        info!(
            status = ?report.status,
            missing_in_cache = report.missing_in_cache.len(),
            orphaned = report.orphaned.len(),
            size_mismatches = report.size_mismatches.len(),
            "cache validation complete"
        );

        if auto_fix {
            let orphans: Vec<String> = report.orphaned.iter().map(|o| o.name.clone()).collect();
            for name in orphans {
                match cache.clear_container(&name).await {
                    Ok((ips, fqdns)) => {
                        info!(
                            container = %name,
                            removed_ip_ranges = ips,
                            removed_fqdns = fqdns,
                            "cleared orphaned container from cache"
                        );
                        report.repaired.push(name);
                    }
                    Err(e) => {
                        warn!(container = %name, error = %e, "failed to clear orphaned container");
                        report.fix_failures.push(crate::reconcile::FixFailure {
                            container: name,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}
