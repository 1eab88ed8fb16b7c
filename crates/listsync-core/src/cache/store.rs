// # SQLite Value Cache
//
// Durable store of cached container membership entries and container
// metadata, backed by a single SQLite database file.
//
// ## Layout
//
// - `ip_ranges(container_name, from_ip, to_ip, added_timestamp, last_seen_timestamp)`
// - `fqdns(container_name, fqdn, added_timestamp, last_seen_timestamp)`
// - `containers(name, kind, last_sync_timestamp, reported_size)`
//
// All timestamps are integer seconds since the Unix epoch, taken from one
// wall clock. Value tables are indexed on `container_name` and
// `last_seen_timestamp` so listing and purge paths stay sub-linear in
// total store size.
//
// ## Concurrency
//
// The file may be opened by several OS processes at once (separate CLI
// invocations). Upserts are single `INSERT ... ON CONFLICT DO UPDATE`
// statements, so uniqueness never depends on a check-then-insert window;
// WAL mode plus a busy timeout covers cross-process contention.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::Error;
use crate::traits::{ContainerKind, IpRange};

/// One cached IP range entry with its timestamps
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IpRangeEntry {
    /// Starting address of the range
    pub from: IpAddr,
    /// Ending address of the range
    pub to: IpAddr,
    /// When the entry was first cached (immutable)
    pub added_at: i64,
    /// When the entry was last confirmed or re-requested
    pub last_seen_at: i64,
}

/// One cached FQDN entry with its timestamps
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FqdnEntry {
    /// The domain name
    pub fqdn: String,
    /// When the entry was first cached (immutable)
    pub added_at: i64,
    /// When the entry was last confirmed or re-requested
    pub last_seen_at: i64,
}

/// Cached per-container metadata
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerRecord {
    /// Container name
    pub name: String,
    /// Kind of values the container holds
    pub kind: ContainerKind,
    /// When metadata was last written after a successful remote mutation
    pub last_sync_at: Option<i64>,
    /// Last size the remote service reported for this container.
    /// A cached copy of remote truth; may differ from the local entry count.
    pub reported_size: Option<u64>,
}

/// Entries removed by a staleness purge, per value kind
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PurgeSummary {
    /// Container the purge ran against
    pub container: String,
    /// IP range entries removed
    pub removed_ip_ranges: u64,
    /// FQDN entries removed
    pub removed_fqdns: u64,
    /// Age threshold the purge used
    pub max_age_days: u32,
}

impl PurgeSummary {
    /// Total entries removed across both value kinds
    pub fn total(&self) -> u64 {
        self.removed_ip_ranges + self.removed_fqdns
    }
}

/// Entries removed by a full container clear
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClearSummary {
    /// Container that was cleared
    pub container: String,
    /// IP range entries removed
    pub removed_ip_ranges: u64,
    /// FQDN entries removed
    pub removed_fqdns: u64,
}

impl ClearSummary {
    /// Total entries removed across both value kinds
    pub fn total(&self) -> u64 {
        self.removed_ip_ranges + self.removed_fqdns
    }
}

/// Cache statistics for a single container
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerCacheStats {
    /// Container name
    pub container: String,
    /// Number of cached IP range entries
    pub cached_ip_ranges: u64,
    /// Number of cached FQDN entries
    pub cached_fqdns: u64,
    /// Registry metadata, when the container has been synced at least once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ContainerRecord>,
}

impl ContainerCacheStats {
    /// Total cached entries across both value kinds
    pub fn total_cached(&self) -> u64 {
        self.cached_ip_ranges + self.cached_fqdns
    }
}

/// Cache statistics across the whole store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GlobalCacheStats {
    /// Total cached IP range entries
    pub total_cached_ip_ranges: u64,
    /// Total cached FQDN entries
    pub total_cached_fqdns: u64,
    /// Number of containers with registry metadata
    pub tracked_containers: u64,
    /// Number of distinct containers holding cached IP ranges
    pub containers_with_ip_ranges: u64,
    /// Number of distinct containers holding cached FQDNs
    pub containers_with_fqdns: u64,
    /// Path of the store file
    pub store_path: PathBuf,
}

/// Cache statistics, scoped per container or store-wide
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum CacheStats {
    /// Statistics for one container
    Container(ContainerCacheStats),
    /// Statistics across the whole store
    Global(GlobalCacheStats),
}

/// SQLite-backed cache of container membership entries and metadata
///
/// One handle owns one pooled connection to one store file. Multiple
/// engine instances may coexist in a process as long as they point at
/// different store locations; cross-process sharing of one file is safe
/// through SQLite's own locking.
///
/// # Example
///
/// ```rust,no_run
/// use listsync_core::cache::ValueCache;
/// use listsync_core::IpRange;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = ValueCache::open("/var/lib/listsync/cache.db").await?;
///
///     let range = IpRange::new("10.0.0.1".parse()?, "10.0.0.10".parse()?);
///     cache.upsert_ip_range("edge-allow", &range).await?;
///     assert!(cache.has_ip_range("edge-allow", &range).await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValueCache {
    pool: Pool<Sqlite>,
    path: PathBuf,
}

impl ValueCache {
    /// Open or create a cache store at the given path
    ///
    /// Creates parent directories as needed and the schema on first use.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::store(format!(
                        "failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(|e| Error::store(format!("invalid cache path {}: {}", path.display(), e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors when several
            // CLI invocations share the store file.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures in-process.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool, path };
        store.init_schema().await?;
        Ok(store)
    }

    /// Path of the underlying store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn init_schema(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ip_ranges (
                container_name TEXT NOT NULL,
                from_ip TEXT NOT NULL,
                to_ip TEXT NOT NULL,
                added_timestamp INTEGER NOT NULL,
                last_seen_timestamp INTEGER NOT NULL,
                PRIMARY KEY (container_name, from_ip, to_ip)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fqdns (
                container_name TEXT NOT NULL,
                fqdn TEXT NOT NULL,
                added_timestamp INTEGER NOT NULL,
                last_seen_timestamp INTEGER NOT NULL,
                PRIMARY KEY (container_name, fqdn)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS containers (
                name TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                last_sync_timestamp INTEGER,
                reported_size INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for stmt in [
            "CREATE INDEX IF NOT EXISTS idx_ip_ranges_container ON ip_ranges(container_name)",
            "CREATE INDEX IF NOT EXISTS idx_fqdns_container ON fqdns(container_name)",
            "CREATE INDEX IF NOT EXISTS idx_ip_ranges_last_seen ON ip_ranges(last_seen_timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_fqdns_last_seen ON fqdns(last_seen_timestamp)",
        ] {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Current wall-clock time as epoch seconds
    ///
    /// Single clock for all timestamp writes and purge cutoffs.
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    //
    // IP range entries
    //

    /// Check whether an IP range is cached for a container
    pub async fn has_ip_range(&self, container: &str, range: &IpRange) -> Result<bool, Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM ip_ranges WHERE container_name = ? AND from_ip = ? AND to_ip = ?",
        )
        .bind(container)
        .bind(range.from.to_string())
        .bind(range.to.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Insert an IP range entry, or refresh `last_seen` if it already exists
    ///
    /// `added_timestamp` is written once and never updated.
    pub async fn upsert_ip_range(&self, container: &str, range: &IpRange) -> Result<(), Error> {
        let now = Self::now();
        sqlx::query(
            r#"
            INSERT INTO ip_ranges (container_name, from_ip, to_ip, added_timestamp, last_seen_timestamp)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(container_name, from_ip, to_ip)
            DO UPDATE SET last_seen_timestamp = excluded.last_seen_timestamp
            "#,
        )
        .bind(container)
        .bind(range.from.to_string())
        .bind(range.to.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh `last_seen` for an existing IP range entry; no-op if absent
    pub async fn touch_ip_range(&self, container: &str, range: &IpRange) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE ip_ranges SET last_seen_timestamp = ?
            WHERE container_name = ? AND from_ip = ? AND to_ip = ?
            "#,
        )
        .bind(Self::now())
        .bind(container)
        .bind(range.from.to_string())
        .bind(range.to.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete an IP range entry; returns whether a row existed
    ///
    /// Removing an absent key is not an error.
    pub async fn remove_ip_range(&self, container: &str, range: &IpRange) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM ip_ranges WHERE container_name = ? AND from_ip = ? AND to_ip = ?",
        )
        .bind(container)
        .bind(range.from.to_string())
        .bind(range.to.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All cached IP ranges for a container, most recently seen first
    pub async fn ip_ranges(&self, container: &str) -> Result<Vec<IpRangeEntry>, Error> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT from_ip, to_ip, added_timestamp, last_seen_timestamp
            FROM ip_ranges
            WHERE container_name = ?
            ORDER BY last_seen_timestamp DESC
            "#,
        )
        .bind(container)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(from, to, added_at, last_seen_at)| {
                Ok(IpRangeEntry {
                    from: parse_stored_ip(&from)?,
                    to: parse_stored_ip(&to)?,
                    added_at,
                    last_seen_at,
                })
            })
            .collect()
    }

    /// Delete IP range entries last seen strictly before `cutoff`
    pub async fn purge_ip_ranges_older_than(
        &self,
        container: &str,
        cutoff: i64,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "DELETE FROM ip_ranges WHERE container_name = ? AND last_seen_timestamp < ?",
        )
        .bind(container)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    //
    // FQDN entries
    //

    /// Check whether an FQDN is cached for a container
    pub async fn has_fqdn(&self, container: &str, fqdn: &str) -> Result<bool, Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM fqdns WHERE container_name = ? AND fqdn = ?")
                .bind(container)
                .bind(fqdn)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Insert an FQDN entry, or refresh `last_seen` if it already exists
    pub async fn upsert_fqdn(&self, container: &str, fqdn: &str) -> Result<(), Error> {
        let now = Self::now();
        sqlx::query(
            r#"
            INSERT INTO fqdns (container_name, fqdn, added_timestamp, last_seen_timestamp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(container_name, fqdn)
            DO UPDATE SET last_seen_timestamp = excluded.last_seen_timestamp
            "#,
        )
        .bind(container)
        .bind(fqdn)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh `last_seen` for an existing FQDN entry; no-op if absent
    pub async fn touch_fqdn(&self, container: &str, fqdn: &str) -> Result<(), Error> {
        sqlx::query("UPDATE fqdns SET last_seen_timestamp = ? WHERE container_name = ? AND fqdn = ?")
            .bind(Self::now())
            .bind(container)
            .bind(fqdn)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete an FQDN entry; returns whether a row existed
    pub async fn remove_fqdn(&self, container: &str, fqdn: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM fqdns WHERE container_name = ? AND fqdn = ?")
            .bind(container)
            .bind(fqdn)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All cached FQDNs for a container, most recently seen first
    pub async fn fqdns(&self, container: &str) -> Result<Vec<FqdnEntry>, Error> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT fqdn, added_timestamp, last_seen_timestamp
            FROM fqdns
            WHERE container_name = ?
            ORDER BY last_seen_timestamp DESC
            "#,
        )
        .bind(container)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(fqdn, added_at, last_seen_at)| FqdnEntry {
                fqdn,
                added_at,
                last_seen_at,
            })
            .collect())
    }

    /// Delete FQDN entries last seen strictly before `cutoff`
    pub async fn purge_fqdns_older_than(&self, container: &str, cutoff: i64) -> Result<u64, Error> {
        let result =
            sqlx::query("DELETE FROM fqdns WHERE container_name = ? AND last_seen_timestamp < ?")
                .bind(container)
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    //
    // Combined maintenance
    //

    /// Delete entries of both kinds older than `max_age_days`
    ///
    /// The cutoff is `now - max_age_days * 86400`; entries exactly at the
    /// cutoff survive. `max_age_days = 0` therefore removes every entry
    /// last seen before this instant.
    pub async fn purge_stale(
        &self,
        container: &str,
        max_age_days: u32,
    ) -> Result<PurgeSummary, Error> {
        let cutoff = Self::now() - i64::from(max_age_days) * 86_400;
        let removed_ip_ranges = self.purge_ip_ranges_older_than(container, cutoff).await?;
        let removed_fqdns = self.purge_fqdns_older_than(container, cutoff).await?;

        tracing::debug!(
            container,
            removed_ip_ranges,
            removed_fqdns,
            max_age_days,
            "purged stale cache entries"
        );

        Ok(PurgeSummary {
            container: container.to_string(),
            removed_ip_ranges,
            removed_fqdns,
            max_age_days,
        })
    }

    /// Delete every cached entry and the registry row for a container
    ///
    /// Returns `(removed_ip_ranges, removed_fqdns)`.
    pub async fn clear_container(&self, container: &str) -> Result<(u64, u64), Error> {
        let ip = sqlx::query("DELETE FROM ip_ranges WHERE container_name = ?")
            .bind(container)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let fqdn = sqlx::query("DELETE FROM fqdns WHERE container_name = ?")
            .bind(container)
            .execute(&self.pool)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM containers WHERE name = ?")
            .bind(container)
            .execute(&self.pool)
            .await?;
        Ok((ip, fqdn))
    }

    /// Cache statistics, for one container or the whole store
    pub async fn stats(&self, container: Option<&str>) -> Result<CacheStats, Error> {
        match container {
            Some(name) => {
                let (ip,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM ip_ranges WHERE container_name = ?")
                        .bind(name)
                        .fetch_one(&self.pool)
                        .await?;
                let (fqdn,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM fqdns WHERE container_name = ?")
                        .bind(name)
                        .fetch_one(&self.pool)
                        .await?;
                let record = self.container_record(name).await?;

                Ok(CacheStats::Container(ContainerCacheStats {
                    container: name.to_string(),
                    cached_ip_ranges: ip as u64,
                    cached_fqdns: fqdn as u64,
                    record,
                }))
            }
            None => {
                let (ip,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ip_ranges")
                    .fetch_one(&self.pool)
                    .await?;
                let (fqdn,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fqdns")
                    .fetch_one(&self.pool)
                    .await?;
                let (tracked,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM containers")
                    .fetch_one(&self.pool)
                    .await?;
                let (ip_containers,): (i64,) =
                    sqlx::query_as("SELECT COUNT(DISTINCT container_name) FROM ip_ranges")
                        .fetch_one(&self.pool)
                        .await?;
                let (fqdn_containers,): (i64,) =
                    sqlx::query_as("SELECT COUNT(DISTINCT container_name) FROM fqdns")
                        .fetch_one(&self.pool)
                        .await?;

                Ok(CacheStats::Global(GlobalCacheStats {
                    total_cached_ip_ranges: ip as u64,
                    total_cached_fqdns: fqdn as u64,
                    tracked_containers: tracked as u64,
                    containers_with_ip_ranges: ip_containers as u64,
                    containers_with_fqdns: fqdn_containers as u64,
                    store_path: self.path.clone(),
                }))
            }
        }
    }

    //
    // Container registry
    //

    /// Kind recorded for a container, if metadata exists
    pub async fn container_kind(&self, name: &str) -> Result<Option<ContainerKind>, Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT kind FROM containers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(kind,)| ContainerKind::from(kind.as_str())))
    }

    /// Create or overwrite container metadata
    ///
    /// Sets `last_sync_timestamp` to now; `reported_size` is whatever the
    /// remote service returned for the mutation, if anything.
    pub async fn upsert_container(
        &self,
        name: &str,
        kind: &ContainerKind,
        reported_size: Option<u64>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO containers (name, kind, last_sync_timestamp, reported_size)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name)
            DO UPDATE SET kind = excluded.kind,
                          last_sync_timestamp = excluded.last_sync_timestamp,
                          reported_size = excluded.reported_size
            "#,
        )
        .bind(name)
        .bind(kind.as_str())
        .bind(Self::now())
        .bind(reported_size.map(|s| s as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Full metadata record for a container
    pub async fn container_record(&self, name: &str) -> Result<Option<ContainerRecord>, Error> {
        let row: Option<(String, String, Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT name, kind, last_sync_timestamp, reported_size FROM containers WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    /// Snapshot of every container metadata record
    pub async fn container_records(&self) -> Result<Vec<ContainerRecord>, Error> {
        let rows: Vec<(String, String, Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT name, kind, last_sync_timestamp, reported_size FROM containers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(record_from_row).collect())
    }

    /// Delete container metadata; entries are untouched
    pub async fn delete_container_record(&self, name: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM containers WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn record_from_row(
    (name, kind, last_sync_at, reported_size): (String, String, Option<i64>, Option<i64>),
) -> ContainerRecord {
    ContainerRecord {
        name,
        kind: ContainerKind::from(kind.as_str()),
        last_sync_at,
        reported_size: reported_size.and_then(|s| u64::try_from(s).ok()),
    }
}

fn parse_stored_ip(text: &str) -> Result<IpAddr, Error> {
    text.parse()
        .map_err(|e| Error::store(format!("corrupt IP address in cache store ({text}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn range(from: &str, to: &str) -> IpRange {
        IpRange::new(from.parse().unwrap(), to.parse().unwrap())
    }

    async fn open_temp() -> (tempfile::TempDir, ValueCache) {
        let dir = tempdir().unwrap();
        let cache = ValueCache::open(dir.path().join("cache.db")).await.unwrap();
        (dir, cache)
    }

    #[tokio::test]
    async fn upsert_is_insert_then_touch() {
        let (_dir, cache) = open_temp().await;
        let r = range("10.0.0.1", "10.0.0.10");

        assert!(!cache.has_ip_range("edge", &r).await.unwrap());
        cache.upsert_ip_range("edge", &r).await.unwrap();
        assert!(cache.has_ip_range("edge", &r).await.unwrap());

        let first = cache.ip_ranges("edge").await.unwrap();
        assert_eq!(first.len(), 1);
        let added = first[0].added_at;
        assert!(first[0].last_seen_at >= added);

        // Second upsert must not duplicate the row and must leave added_at alone
        cache.upsert_ip_range("edge", &r).await.unwrap();
        let second = cache.ip_ranges("edge").await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].added_at, added);
        assert!(second[0].last_seen_at >= first[0].last_seen_at);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let (_dir, cache) = open_temp().await;
        let r = range("192.168.0.1", "192.168.0.1");

        cache.upsert_ip_range("edge", &r).await.unwrap();
        assert!(cache.remove_ip_range("edge", &r).await.unwrap());
        assert!(!cache.remove_ip_range("edge", &r).await.unwrap());
    }

    #[tokio::test]
    async fn touch_on_absent_key_is_noop() {
        let (_dir, cache) = open_temp().await;

        cache.touch_fqdn("edge", "ghost.example.com").await.unwrap();
        assert!(!cache.has_fqdn("edge", "ghost.example.com").await.unwrap());
    }

    #[tokio::test]
    async fn entries_are_scoped_per_container() {
        let (_dir, cache) = open_temp().await;

        cache.upsert_fqdn("a", "shared.example.com").await.unwrap();
        assert!(cache.has_fqdn("a", "shared.example.com").await.unwrap());
        assert!(!cache.has_fqdn("b", "shared.example.com").await.unwrap());
    }

    #[tokio::test]
    async fn purge_cutoff_is_strict() {
        let (_dir, cache) = open_temp().await;
        let r = range("10.0.0.1", "10.0.0.2");

        cache.upsert_ip_range("edge", &r).await.unwrap();
        let last_seen = cache.ip_ranges("edge").await.unwrap()[0].last_seen_at;

        // Cutoff equal to last_seen: strict < spares the entry
        let removed = cache
            .purge_ip_ranges_older_than("edge", last_seen)
            .await
            .unwrap();
        assert_eq!(removed, 0);

        // Cutoff one past last_seen: entry goes
        let removed = cache
            .purge_ip_ranges_older_than("edge", last_seen + 1)
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn purge_stale_covers_both_kinds() {
        let (_dir, cache) = open_temp().await;

        cache
            .upsert_ip_range("edge", &range("10.0.0.1", "10.0.0.2"))
            .await
            .unwrap();
        cache.upsert_fqdn("edge", "a.example.com").await.unwrap();

        // A huge threshold keeps everything
        let summary = cache.purge_stale("edge", 3650).await.unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[tokio::test]
    async fn clear_container_drops_entries_and_metadata() {
        let (_dir, cache) = open_temp().await;

        cache
            .upsert_ip_range("edge", &range("10.0.0.1", "10.0.0.2"))
            .await
            .unwrap();
        cache.upsert_fqdn("edge", "a.example.com").await.unwrap();
        cache
            .upsert_container("edge", &ContainerKind::Ip, Some(7))
            .await
            .unwrap();

        let (ips, fqdns) = cache.clear_container("edge").await.unwrap();
        assert_eq!((ips, fqdns), (1, 1));
        assert!(cache.container_record("edge").await.unwrap().is_none());
        assert!(cache.ip_ranges("edge").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn registry_roundtrip_and_overwrite() {
        let (_dir, cache) = open_temp().await;

        cache
            .upsert_container("edge", &ContainerKind::Ip, Some(5))
            .await
            .unwrap();
        let record = cache.container_record("edge").await.unwrap().unwrap();
        assert_eq!(record.kind, ContainerKind::Ip);
        assert_eq!(record.reported_size, Some(5));
        assert!(record.last_sync_at.is_some());

        cache
            .upsert_container("edge", &ContainerKind::Ip, Some(9))
            .await
            .unwrap();
        let record = cache.container_record("edge").await.unwrap().unwrap();
        assert_eq!(record.reported_size, Some(9));

        assert_eq!(
            cache.container_kind("edge").await.unwrap(),
            Some(ContainerKind::Ip)
        );
        assert_eq!(cache.container_kind("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_kind_roundtrips_opaquely() {
        let (_dir, cache) = open_temp().await;

        let kind = ContainerKind::Other("mixed".to_string());
        cache.upsert_container("odd", &kind, None).await.unwrap();
        assert_eq!(cache.container_kind("odd").await.unwrap(), Some(kind));
    }

    #[tokio::test]
    async fn stats_count_per_container_and_globally() {
        let (_dir, cache) = open_temp().await;

        cache
            .upsert_ip_range("a", &range("10.0.0.1", "10.0.0.2"))
            .await
            .unwrap();
        cache.upsert_fqdn("a", "x.example.com").await.unwrap();
        cache.upsert_fqdn("b", "y.example.com").await.unwrap();
        cache
            .upsert_container("a", &ContainerKind::Ip, Some(2))
            .await
            .unwrap();

        match cache.stats(Some("a")).await.unwrap() {
            CacheStats::Container(stats) => {
                assert_eq!(stats.cached_ip_ranges, 1);
                assert_eq!(stats.cached_fqdns, 1);
                assert_eq!(stats.total_cached(), 2);
                assert_eq!(stats.record.unwrap().reported_size, Some(2));
            }
            other => panic!("expected container stats, got {:?}", other),
        }

        match cache.stats(None).await.unwrap() {
            CacheStats::Global(stats) => {
                assert_eq!(stats.total_cached_ip_ranges, 1);
                assert_eq!(stats.total_cached_fqdns, 2);
                assert_eq!(stats.tracked_containers, 1);
                assert_eq!(stats.containers_with_fqdns, 2);
            }
            other => panic!("expected global stats, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let r = range("10.1.0.0", "10.1.0.255");

        {
            let cache = ValueCache::open(&path).await.unwrap();
            cache.upsert_ip_range("edge", &r).await.unwrap();
        }

        let cache = ValueCache::open(&path).await.unwrap();
        assert!(cache.has_ip_range("edge", &r).await.unwrap());
    }
}
