//! Immutable, content-addressed view of one registry value.

use std::fmt;

use conf_registry::Version;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// BLAKE3 digest of a payload.
///
/// Depends only on the bytes, so a rewrite or touch that bumps the version
/// without altering content keeps the same signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 32]);

impl Signature {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One registry value: decrypted bytes, parsed object, version and signature
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    path: String,
    raw: Vec<u8>,
    parsed: Map<String, Value>,
    version: Version,
    signature: Signature,
}

impl ConfigSnapshot {
    /// Parse `raw` into a snapshot. The payload must be a JSON object.
    pub fn parse(
        path: impl Into<String>,
        raw: Vec<u8>,
        version: Version,
    ) -> Result<Self, serde_json::Error> {
        let parsed: Map<String, Value> = serde_json::from_slice(&raw)?;
        Ok(Self {
            path: path.into(),
            signature: Signature::of(&raw),
            raw,
            parsed,
            version,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Field of the structured view
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.parsed.get(key)
    }

    /// Field rendered as a string, `default` when absent or null
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.parsed.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Decode the payload into a caller-supplied shape
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[test]
    fn test_signature_ignores_version() {
        let a = ConfigSnapshot::parse("/a", br#"{"status":"start"}"#.to_vec(), 1).unwrap();
        let b = ConfigSnapshot::parse("/a", br#"{"status":"start"}"#.to_vec(), 7).unwrap();
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn test_signature_tracks_bytes() {
        let a = ConfigSnapshot::parse("/a", br#"{"status":"start"}"#.to_vec(), 1).unwrap();
        let b = ConfigSnapshot::parse("/a", br#"{"status":"stop"}"#.to_vec(), 1).unwrap();
        assert_ne!(a.signature(), b.signature());

        // Whitespace is content too
        let c = ConfigSnapshot::parse("/a", br#"{ "status":"start"}"#.to_vec(), 1).unwrap();
        assert_ne!(a.signature(), c.signature());
        assert_eq!(a.signature().to_hex().len(), 64);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(ConfigSnapshot::parse("/a", b"[1,2]".to_vec(), 1).is_err());
        assert!(ConfigSnapshot::parse("/a", b"not json".to_vec(), 1).is_err());
        assert!(ConfigSnapshot::parse("/a", Vec::new(), 1).is_err());
    }

    #[test]
    fn test_get_str_defaults() {
        let snap = ConfigSnapshot::parse(
            "/a",
            br#"{"status":"stop","timeout":10,"gone":null}"#.to_vec(),
            1,
        )
        .unwrap();
        assert_eq!(snap.get_str("status", "start"), "stop");
        assert_eq!(snap.get_str("timeout", "0"), "10");
        assert_eq!(snap.get_str("gone", "x"), "x");
        assert_eq!(snap.get_str("missing", "start"), "start");
    }

    #[test]
    fn test_decode() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Mqc {
            timeout: u32,
        }
        let snap = ConfigSnapshot::parse("/a/mqc", br#"{"timeout":10}"#.to_vec(), 3).unwrap();
        assert_eq!(snap.decode::<Mqc>().unwrap(), Mqc { timeout: 10 });
        assert!(snap.decode::<Vec<u32>>().is_err());
    }
}
