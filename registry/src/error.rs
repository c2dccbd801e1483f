//! Registry error types.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Invalid registry address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported registry protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid registry path: {0}")]
    InvalidPath(String),
}
