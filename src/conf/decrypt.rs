use thiserror::Error;

/// Error raised by a [`Decryptor`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecryptError(pub String);

/// Transform applied to every fetched payload before parsing
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, DecryptError>;
}

/// Identity transform for registries holding plain payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Decryptor for PlainText {
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, DecryptError> {
        Ok(raw.to_vec())
    }
}

impl<F> Decryptor for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, DecryptError> + Send + Sync,
{
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, DecryptError> {
        self(raw)
    }
}
