// # Container Service Trait
//
// Defines the interface for mutating and listing remote membership
// containers via a provider API.
//
// ## Implementations
//
// - Cato Networks: `listsync-provider-cato` crate
// - Test doubles: mock services in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use listsync_core::ContainerService;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let service = /* ContainerService implementation */;
//
//     let receipt = service
//         .add_fqdns("blocklist", &["bad.example.com".to_string()])
//         .await?;
//     println!("container now reports {:?} values", receipt.reported_size);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Kind of values a remote container holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// IP address range container
    Ip,
    /// Fully-qualified domain name container
    Fqdn,
    /// A kind reported by the remote side that this crate does not model.
    /// Preserved opaquely; the engine never interprets it.
    Other(String),
}

impl ContainerKind {
    /// Stable string form used for storage and display
    pub fn as_str(&self) -> &str {
        match self {
            ContainerKind::Ip => "ip",
            ContainerKind::Fqdn => "fqdn",
            ContainerKind::Other(s) => s,
        }
    }
}

impl From<&str> for ContainerKind {
    fn from(s: &str) -> Self {
        match s {
            "ip" => ContainerKind::Ip,
            "fqdn" => ContainerKind::Fqdn,
            other => ContainerKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contiguous IP address range
///
/// Syntactic validity of the endpoints is guaranteed by the type; ordering
/// of `from`/`to` is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange {
    /// Starting address of the range (inclusive)
    pub from: IpAddr,
    /// Ending address of the range (inclusive)
    pub to: IpAddr,
}

impl IpRange {
    /// Create a new range from explicit endpoints
    pub fn new(from: IpAddr, to: IpAddr) -> Self {
        Self { from, to }
    }

    /// Range covering a single address
    pub fn single(addr: IpAddr) -> Self {
        Self {
            from: addr,
            to: addr,
        }
    }
}

impl std::fmt::Display for IpRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Metadata about a remote container, as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container name (unique within the account)
    pub name: String,
    /// Kind of values the container holds
    pub kind: ContainerKind,
    /// Aggregate value count reported by the service
    pub size: u64,
    /// Container description, if the service returned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of a successful remote mutation
///
/// Decoded once at the provider boundary; the engine and its callers never
/// see wire-shaped payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationReceipt {
    /// Name of the mutated container
    pub container: String,
    /// Aggregate container size reported in the mutation response, when the
    /// service included one
    pub reported_size: Option<u64>,
}

/// Trait for remote container service implementations
///
/// This trait defines the interface for the authoritative remote store of
/// membership containers. Implementations handle the specifics of the
/// provider's API.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Constraints on Implementations
///
/// Service implementations are external integrations and must stay
/// single-shot:
///
/// - Perform one API call per method invocation
/// - No retry or backoff logic (retry policy belongs to the caller)
/// - No caching of container membership (owned by the engine's cache store)
/// - No spawned tasks or background work
/// - Credentials must never appear in logs or Debug output
///
/// # Errors
///
/// Methods fail with [`Error::RemoteUnavailable`](crate::Error::RemoteUnavailable)
/// for connectivity/transport problems and
/// [`Error::RemoteRejected`](crate::Error::RemoteRejected) when the service
/// executed the request but reported domain-level errors. Both abort the
/// engine's mutation with zero local state change.
#[async_trait]
pub trait ContainerService: Send + Sync {
    /// Create an IP address range container, optionally seeded with values
    async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo, crate::Error>;

    /// Create an FQDN container, optionally seeded with values
    async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo, crate::Error>;

    /// Add IP ranges to an existing container
    ///
    /// The service treats the batch as all-or-nothing: on error, none of
    /// the ranges were added.
    async fn add_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt, crate::Error>;

    /// Remove IP ranges from an existing container
    async fn remove_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt, crate::Error>;

    /// Add FQDNs to an existing container
    ///
    /// The service treats the batch as all-or-nothing: on error, none of
    /// the values were added.
    async fn add_fqdns(
        &self,
        container: &str,
        fqdns: &[String],
    ) -> Result<MutationReceipt, crate::Error>;

    /// Remove FQDNs from an existing container
    async fn remove_fqdns(
        &self,
        container: &str,
        fqdns: &[String],
    ) -> Result<MutationReceipt, crate::Error>;

    /// List all containers in the account with their reported sizes
    ///
    /// The service reports aggregate sizes only; there is no endpoint to
    /// enumerate a container's member values.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, crate::Error>;

    /// Delete a container
    async fn delete_container(&self, name: &str) -> Result<(), crate::Error>;

    /// Get the service name (for logging/debugging)
    fn service_name(&self) -> &'static str;
}

/// Shared handles delegate to the inner service, so callers can keep a
/// probe reference while the engine owns a boxed clone
#[async_trait]
impl<T: ContainerService + ?Sized> ContainerService for std::sync::Arc<T> {
    async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo, crate::Error> {
        (**self).create_ip_container(name, description, initial).await
    }

    async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo, crate::Error> {
        (**self).create_fqdn_container(name, description, initial).await
    }

    async fn add_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt, crate::Error> {
        (**self).add_ip_ranges(container, ranges).await
    }

    async fn remove_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt, crate::Error> {
        (**self).remove_ip_ranges(container, ranges).await
    }

    async fn add_fqdns(
        &self,
        container: &str,
        fqdns: &[String],
    ) -> Result<MutationReceipt, crate::Error> {
        (**self).add_fqdns(container, fqdns).await
    }

    async fn remove_fqdns(
        &self,
        container: &str,
        fqdns: &[String],
    ) -> Result<MutationReceipt, crate::Error> {
        (**self).remove_fqdns(container, fqdns).await
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, crate::Error> {
        (**self).list_containers().await
    }

    async fn delete_container(&self, name: &str) -> Result<(), crate::Error> {
        (**self).delete_container(name).await
    }

    fn service_name(&self) -> &'static str {
        (**self).service_name()
    }
}
