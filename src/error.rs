//! Error types for configuration loading and cluster membership.
//!
//! Only loading can fail. The comparer and the cluster view answer with
//! documented boolean defaults on absent input.

use conf_registry::RegistryError;
use thiserror::Error;

use crate::conf::DecryptError;

pub type ConfResult<T> = Result<T, ConfError>;

#[derive(Debug, Error)]
pub enum ConfError {
    /// Root or sub-configuration node missing from the registry
    #[error("Configuration not found: {0}")]
    NotFound(String),

    /// Payload present but not a structured object
    #[error("Malformed configuration at {path}: {source}")]
    MalformedConfig {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Named sub-configuration absent from an otherwise valid tree
    #[error("No setting named {0}")]
    NoSetting(String),

    /// Structured view does not fit the requested shape
    #[error("Failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decrypt {path}: {source}")]
    Decrypt {
        path: String,
        #[source]
        source: DecryptError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Registration name not of the form `<host>_<serverID>`
    #[error("Malformed cluster node name: '{0}'")]
    MalformedNode(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
