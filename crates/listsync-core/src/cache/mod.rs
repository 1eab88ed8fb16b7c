//! Local cache of remote container membership
//!
//! The cache mirrors which values (IP ranges, FQDNs) are known to be
//! present in which remote containers, with add/last-seen timestamps, plus
//! per-container metadata (kind, last remote-reported size). It exists to
//! let the engine skip remote mutations for values already known to be
//! present and to purge entries by staleness.
//!
//! The cache is a mirror, never the source of truth: the remote service is
//! authoritative, and the registry's `reported_size` is a cached copy of
//! what the service last reported, not a local count.

mod store;

pub use store::{
    CacheStats, ClearSummary, ContainerCacheStats, ContainerRecord, FqdnEntry, GlobalCacheStats,
    IpRangeEntry, PurgeSummary, ValueCache,
};
