//! Configuration snapshots and change detection
//!
//! - [`ConfigSnapshot`]: one registry value with its version and signature
//! - [`ConfigTree`]: main configuration plus named sub-configurations
//! - [`SnapshotComparer`]: decides whether a new tree is a real change

mod comparer;
mod decrypt;
mod server_pub;
mod snapshot;
mod tree;

pub use comparer::{ChangeSet, SnapshotComparer};
pub use decrypt::{DecryptError, Decryptor, PlainText};
pub use server_pub::ServerPub;
pub use snapshot::{ConfigSnapshot, Signature};
pub use tree::ConfigTree;
