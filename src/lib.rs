//! Registry-backed configuration snapshots and cluster membership
//!
//! This crate keeps a service consistent with configuration stored in a
//! hierarchical registry:
//! - Immutable configuration trees fetched in one pass
//! - Version-gated, content-confirmed change detection at three granularities
//! - Ordinal-based master election from the servers listing

pub mod cluster;
pub mod conf;
pub mod config;
pub mod error;
pub mod logging;
pub mod watcher;

pub use cluster::{ClusterNode, ClusterView};
pub use conf::{
    ChangeSet, ConfigSnapshot, ConfigTree, DecryptError, Decryptor, PlainText, ServerPub,
    Signature, SnapshotComparer,
};
pub use config::AppConfig;
pub use error::{ClusterError, ConfError, ConfResult};
pub use watcher::ConfWatcher;
