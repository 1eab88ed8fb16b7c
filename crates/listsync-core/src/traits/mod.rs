//! Core trait definitions
//!
//! The trait in this module defines the seam between the engine and the
//! remote container service. Implementations live in provider crates.

pub mod container_service;

pub use container_service::{
    ContainerInfo, ContainerKind, ContainerService, IpRange, MutationReceipt,
};
