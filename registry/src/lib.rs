//! Hierarchical Versioned Registry
//!
//! This crate defines the narrow interface fleet-conf consumes from a
//! ZooKeeper/etcd/Redis-like registry:
//! - Versioned values addressed by slash-separated paths
//! - Directory-style children listings in creation order
//! - Change notification for watched paths
//!
//! It also ships the registry address parser and an in-memory backend
//! (`lm://`) used for local runs and tests.

mod address;
mod error;
mod memory;
mod path;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use address::{RegistryAddress, PROTO_LM, PROTO_LMQ, PROTO_REDIS, PROTO_ZK};
pub use error::{RegistryError, RegistryResult};
pub use memory::MemoryRegistry;
pub use path::{join, parent};

/// Version assigned by the registry on every write to a path.
pub type Version = i32;

/// Kind of change observed on a registry path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Value written (created, rewritten or touched)
    ValueChanged,
    /// A child was added or removed
    ChildrenChanged,
    /// Path removed
    Deleted,
}

/// Change notification published by a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    pub path: String,
    pub kind: EventKind,
}

impl RegistryEvent {
    pub fn new(path: impl Into<String>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// True if this event concerns `path` itself or one of its direct children.
    pub fn touches(&self, path: &str) -> bool {
        self.path == path || parent(&self.path).is_some_and(|p| p == path)
    }
}

/// Capability consumed from a hierarchical registry.
///
/// Children MUST be returned in creation order: cluster master election
/// relies on the ordinal of each sibling within the listing.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the value stored at `path` together with its version.
    async fn get_value(&self, path: &str) -> RegistryResult<(Vec<u8>, Version)>;

    /// List the child names of `path` in creation order, with the children version.
    async fn get_children(&self, path: &str) -> RegistryResult<(Vec<String>, Version)>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent>;
}

/// Open a registry for the given `proto://addr` address.
///
/// Only the local in-memory protocol is built in; remote registry clients
/// plug in by implementing [`Registry`].
pub fn connect(address: &str) -> RegistryResult<std::sync::Arc<dyn Registry>> {
    let addr = RegistryAddress::parse(address)?;
    match addr.proto.as_str() {
        PROTO_LM => {
            tracing::info!(address = %addr, "Opening in-memory registry");
            Ok(std::sync::Arc::new(MemoryRegistry::new()))
        }
        other => Err(RegistryError::UnsupportedProtocol(other.to_string())),
    }
}
