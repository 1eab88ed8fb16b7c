// # listsync-core
//
// Core library for the container membership cache and reconciliation engine.
//
// ## Architecture Overview
//
// This library keeps remotely-hosted membership containers (IP ranges,
// FQDNs) in sync with a local persistent mirror:
//
// - **ContainerService**: Trait for the authoritative remote container API
// - **ValueCache**: SQLite-backed store of cached entries and container
//   metadata with add/last-seen timestamps
// - **ContainerEngine**: Cache gate wrapping every add/remove mutation —
//   skips remote calls for values already known to be present, and keeps
//   the cache consistent with confirmed remote outcomes
// - **reconcile**: Registry-level validation of cache state against the
//   remote container listing, with optional orphan repair
//
// ## Design Principles
//
// 1. **Remote is authoritative**: the cache is a mirror; removals always
//    hit the remote service, and local writes follow confirmed success
// 2. **No phantom state**: a failed remote mutation leaves the cache
//    untouched
// 3. **Library-First**: all functionality is usable without the CLI
// 4. **No ambient globals**: every engine owns its store handle explicitly

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod traits;

// Re-export core types for convenience
pub use cache::{CacheStats, ClearSummary, PurgeSummary, ValueCache};
pub use config::{CacheConfig, EngineConfig};
pub use engine::{AddOutcome, CachedValues, ContainerEngine, ContainerListing, RemoveOutcome};
pub use error::{Error, Result};
pub use reconcile::{ValidationReport, ValidationStatus};
pub use traits::{ContainerInfo, ContainerKind, ContainerService, IpRange, MutationReceipt};
