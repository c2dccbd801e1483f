//! Point-in-time aggregate of the main configuration and its sub-configurations.

use std::{collections::HashMap, ops::ControlFlow};

use conf_registry::{join, Registry, RegistryError, Version};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{decrypt::Decryptor, snapshot::ConfigSnapshot};
use crate::error::{ConfError, ConfResult};

/// Immutable configuration tree.
///
/// A reload never patches an existing tree: it builds a new one and the
/// previous tree stays readable for as long as someone holds it.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    main_path: String,
    root: Option<ConfigSnapshot>,
    children: HashMap<String, ConfigSnapshot>,
}

impl ConfigTree {
    /// Tree for a main path that holds no configuration
    pub fn absent(main_path: impl Into<String>) -> Self {
        Self {
            main_path: main_path.into(),
            root: None,
            children: HashMap::new(),
        }
    }

    pub fn new(
        main_path: impl Into<String>,
        root: ConfigSnapshot,
        children: HashMap<String, ConfigSnapshot>,
    ) -> Self {
        Self {
            main_path: main_path.into(),
            root: Some(root),
            children,
        }
    }

    /// Fetch the main configuration and every child of `main_path`.
    ///
    /// Fails with [`ConfError::NotFound`] when the main path has no value.
    /// Any child that cannot be fetched, decrypted or parsed fails the whole
    /// load; there is no partially populated tree.
    pub async fn load<R, D>(registry: &R, main_path: &str, decryptor: &D) -> ConfResult<Self>
    where
        R: Registry + ?Sized,
        D: Decryptor + ?Sized,
    {
        let root = match fetch_snapshot(registry, main_path, decryptor).await {
            Ok(root) => root,
            Err(ConfError::Registry(RegistryError::NotFound(_))) => {
                return Err(ConfError::NotFound(main_path.to_string()))
            }
            Err(e) => return Err(e),
        };

        let (names, _) = registry.get_children(main_path).await?;
        let mut children = HashMap::with_capacity(names.len());
        for name in names {
            let child_path = join(&[main_path, name.as_str()]);
            let child = match fetch_snapshot(registry, &child_path, decryptor).await {
                Ok(child) => child,
                Err(ConfError::Registry(RegistryError::NotFound(_))) => {
                    return Err(ConfError::NotFound(child_path))
                }
                Err(e) => return Err(e),
            };
            debug!(
                "Loaded sub-configuration {} (version {})",
                child_path,
                child.version()
            );
            children.insert(name, child);
        }

        info!(
            path = main_path,
            version = root.version(),
            children = children.len(),
            "Configuration tree loaded"
        );
        Ok(Self::new(main_path, root, children))
    }

    pub fn main_path(&self) -> &str {
        &self.main_path
    }

    /// Root version, `None` when the root is absent
    pub fn version(&self) -> Option<Version> {
        self.root.as_ref().map(ConfigSnapshot::version)
    }

    pub fn root(&self) -> Option<&ConfigSnapshot> {
        self.root.as_ref()
    }

    pub fn child(&self, name: &str) -> Option<&ConfigSnapshot> {
        self.children.get(name)
    }

    /// True if any of `names` is a sub-configuration of this tree
    pub fn has_child(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.children.contains_key(*name))
    }

    /// Iterate sub-configurations in unspecified order
    pub fn children(&self) -> impl Iterator<Item = (&str, &ConfigSnapshot)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Visit every sub-configuration until the visitor breaks
    pub fn for_each_child<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &ConfigSnapshot) -> ControlFlow<()>,
    {
        for (name, snapshot) in self.children() {
            if visitor(name, snapshot).is_break() {
                break;
            }
        }
    }

    /// Decode the main configuration, returning it with its version
    pub fn unmarshal_root<T: DeserializeOwned>(&self) -> ConfResult<(T, Version)> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| ConfError::NotFound(self.main_path.clone()))?;
        let value = root.decode().map_err(|source| ConfError::Decode {
            name: self.main_path.clone(),
            source,
        })?;
        Ok((value, root.version()))
    }

    /// Decode a sub-configuration, returning it with its version
    pub fn unmarshal_child<T: DeserializeOwned>(&self, name: &str) -> ConfResult<(T, Version)> {
        let child = self
            .child(name)
            .ok_or_else(|| ConfError::NoSetting(name.to_string()))?;
        let value = child.decode().map_err(|source| ConfError::Decode {
            name: name.to_string(),
            source,
        })?;
        Ok((value, child.version()))
    }

    /// Root string field with a default, `default` when the root is absent
    pub fn root_str(&self, key: &str, default: &str) -> String {
        self.root
            .as_ref()
            .map(|r| r.get_str(key, default))
            .unwrap_or_else(|| default.to_string())
    }

    /// Whether the service is marked as started (`status`, default `start`)
    pub fn is_started(&self) -> bool {
        self.root_str("status", "start") == "start"
    }

    /// Whether request/response tracing is on (`trace`, default `true`)
    pub fn is_trace(&self) -> bool {
        self.root_str("trace", "true") == "true"
    }
}

async fn fetch_snapshot<R, D>(registry: &R, path: &str, decryptor: &D) -> ConfResult<ConfigSnapshot>
where
    R: Registry + ?Sized,
    D: Decryptor + ?Sized,
{
    let (raw, version) = registry.get_value(path).await?;
    let plain = decryptor
        .decrypt(&raw)
        .map_err(|source| ConfError::Decrypt {
            path: path.to_string(),
            source,
        })?;
    ConfigSnapshot::parse(path, plain, version).map_err(|source| ConfError::MalformedConfig {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use conf_registry::MemoryRegistry;
    use serde::Deserialize;

    use super::*;
    use crate::conf::{DecryptError, PlainText};

    const MAIN: &str = "/hydra/api/t/conf";

    fn seeded() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry
            .create_or_update(MAIN, r#"{"status":"start","trace":"false"}"#)
            .unwrap();
        registry
            .create_or_update("/hydra/api/t/conf/mqc", r#"{"timeout":10}"#)
            .unwrap();
        registry
            .create_or_update("/hydra/api/t/conf/router", r#"{"routers":[]}"#)
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_load_root_and_children() {
        let registry = seeded();
        let tree = ConfigTree::load(&registry, MAIN, &PlainText).await.unwrap();

        assert_eq!(tree.version(), Some(1));
        assert_eq!(tree.child_count(), 2);
        assert!(tree.child("mqc").is_some());
        assert!(tree.child("nope").is_none());
        assert!(tree.has_child(&["nope", "router"]));
        assert!(!tree.has_child(&["nope"]));
        assert!(!tree.has_child(&[]));
        assert!(tree.is_started());
        assert!(!tree.is_trace());
    }

    #[tokio::test]
    async fn test_load_missing_root_is_not_found() {
        let registry = MemoryRegistry::new();
        let err = ConfigTree::load(&registry, MAIN, &PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfError::NotFound(p) if p == MAIN));
    }

    #[tokio::test]
    async fn test_malformed_child_aborts_load() {
        let registry = seeded();
        registry
            .create_or_update("/hydra/api/t/conf/broken", "{not json")
            .unwrap();

        let err = ConfigTree::load(&registry, MAIN, &PlainText)
            .await
            .unwrap_err();
        match err {
            ConfError::MalformedConfig { path, .. } => {
                assert_eq!(path, "/hydra/api/t/conf/broken")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_root_aborts_load() {
        let registry = MemoryRegistry::new();
        registry.create_or_update(MAIN, "[]").unwrap();
        let err = ConfigTree::load(&registry, MAIN, &PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfError::MalformedConfig { path, .. } if path == MAIN));
    }

    #[tokio::test]
    async fn test_decryptor_applied_to_every_payload() {
        let registry = MemoryRegistry::new();
        registry.create_or_update(MAIN, "}1:\"a\"{").unwrap();
        registry
            .create_or_update("/hydra/api/t/conf/mqc", "}01:\"tuoemit\"{")
            .unwrap();

        let reverse = |raw: &[u8]| -> Result<Vec<u8>, DecryptError> {
            Ok(raw.iter().rev().copied().collect())
        };
        let tree = ConfigTree::load(&registry, MAIN, &reverse).await.unwrap();
        assert_eq!(tree.root().unwrap().get_str("a", ""), "1");
        assert_eq!(tree.child("mqc").unwrap().get_str("timeout", ""), "10");
        // Signature is over the decrypted bytes
        assert_eq!(tree.root().unwrap().raw(), br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_decrypt_failure_reports_path() {
        let registry = seeded();
        let failing = |_: &[u8]| -> Result<Vec<u8>, DecryptError> {
            Err(DecryptError("bad key".to_string()))
        };
        let err = ConfigTree::load(&registry, MAIN, &failing)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfError::Decrypt { path, .. } if path == MAIN));
    }

    #[tokio::test]
    async fn test_unmarshal_child_round_trip() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Mqc {
            timeout: u64,
        }

        let registry = seeded();
        let tree = ConfigTree::load(&registry, MAIN, &PlainText).await.unwrap();

        let (mqc, version): (Mqc, _) = tree.unmarshal_child("mqc").unwrap();
        assert_eq!(mqc, Mqc { timeout: 10 });
        assert_eq!(version, 1);

        assert!(matches!(
            tree.unmarshal_child::<Mqc>("missing"),
            Err(ConfError::NoSetting(n)) if n == "missing"
        ));
        assert!(matches!(
            tree.unmarshal_child::<Mqc>("router"),
            Err(ConfError::Decode { name, .. }) if name == "router"
        ));
    }

    #[tokio::test]
    async fn test_unmarshal_root() {
        #[derive(Debug, Deserialize)]
        struct Main {
            status: String,
        }
        let registry = seeded();
        let tree = ConfigTree::load(&registry, MAIN, &PlainText).await.unwrap();
        let (main, version): (Main, _) = tree.unmarshal_root().unwrap();
        assert_eq!(main.status, "start");
        assert_eq!(version, 1);

        let absent = ConfigTree::absent(MAIN);
        assert!(matches!(
            absent.unmarshal_root::<Main>(),
            Err(ConfError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_for_each_child_stops_early() {
        let registry = seeded();
        let tree = ConfigTree::load(&registry, MAIN, &PlainText).await.unwrap();

        let mut visited = 0;
        tree.for_each_child(|_, _| {
            visited += 1;
            ControlFlow::Break(())
        });
        assert_eq!(visited, 1);

        let mut all = Vec::new();
        tree.for_each_child(|name, _| {
            all.push(name.to_string());
            ControlFlow::Continue(())
        });
        all.sort();
        assert_eq!(all, vec!["mqc", "router"]);

        // Traversal is restartable
        assert_eq!(tree.children().count(), tree.children().count());
    }

    #[test]
    fn test_absent_tree_defaults() {
        let tree = ConfigTree::absent(MAIN);
        assert_eq!(tree.version(), None);
        assert!(tree.root().is_none());
        assert!(tree.is_started());
        assert!(tree.is_trace());
        assert_eq!(tree.main_path(), MAIN);
    }
}
