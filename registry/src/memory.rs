use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use super::{
    error::{RegistryError, RegistryResult},
    path::{base_name, join, parent},
    EventKind, Registry, RegistryEvent, Version,
};

// ============================================================================
// In-Memory Hierarchical Registry - Versioned Values With Ordered Children
// ============================================================================

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A single registry node
#[derive(Debug, Clone, Default)]
struct Node {
    /// `None` for directory nodes created implicitly as parents
    value: Option<Vec<u8>>,
    version: Version,
    /// Child names in creation order
    children: Vec<String>,
    children_version: Version,
}

/// In-memory registry, shared by cloning.
///
/// Every write to a value bumps its version, even when the bytes are
/// unchanged, mirroring how real registries treat a rewrite. Versions are
/// 32-bit counters and wrap past `i32::MAX`.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    nodes: Arc<RwLock<HashMap<String, Node>>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Create or overwrite the value at `path`, creating missing parents.
    /// Returns the new version.
    pub fn create_or_update(&self, path: &str, value: impl Into<Vec<u8>>) -> RegistryResult<Version> {
        let path = normalize(path)?;
        let mut events = Vec::new();
        let version = {
            let mut nodes = self.nodes.write();
            ensure_node(&mut nodes, &path, &mut events);
            let node = nodes
                .get_mut(&path)
                .ok_or_else(|| RegistryError::NotFound(path.clone()))?;
            node.value = Some(value.into());
            node.version = node.version.wrapping_add(1);
            node.version
        };
        debug!("Write: path={}, version={}", path, version);
        events.push(RegistryEvent::new(path, EventKind::ValueChanged));
        self.publish(events);
        Ok(version)
    }

    /// Bump the version of an existing value without changing its bytes.
    pub fn touch(&self, path: &str) -> RegistryResult<Version> {
        let path = normalize(path)?;
        let version = {
            let mut nodes = self.nodes.write();
            match nodes.get_mut(&path) {
                Some(node) if node.value.is_some() => {
                    node.version = node.version.wrapping_add(1);
                    node.version
                }
                _ => return Err(RegistryError::NotFound(path)),
            }
        };
        debug!("Touch: path={}, version={}", path, version);
        self.publish(vec![RegistryEvent::new(path, EventKind::ValueChanged)]);
        Ok(version)
    }

    /// Remove `path` and everything below it.
    pub fn delete(&self, path: &str) -> RegistryResult<()> {
        let path = normalize(path)?;
        let mut events = Vec::new();
        {
            let mut nodes = self.nodes.write();
            if nodes.remove(&path).is_none() {
                return Err(RegistryError::NotFound(path));
            }
            let prefix = format!("{}/", path.trim_end_matches('/'));
            nodes.retain(|k, _| !k.starts_with(&prefix));

            if let Some(parent_path) = parent(&path) {
                if let Some(p) = nodes.get_mut(parent_path) {
                    let name = base_name(&path);
                    p.children.retain(|c| c != name);
                    p.children_version = p.children_version.wrapping_add(1);
                    events.push(RegistryEvent::new(parent_path, EventKind::ChildrenChanged));
                }
            }
        }
        debug!("Delete: path={}", path);
        events.push(RegistryEvent::new(path, EventKind::Deleted));
        self.publish(events);
        Ok(())
    }

    /// Check if a node exists at `path` (value or directory)
    pub fn exists(&self, path: &str) -> bool {
        normalize(path)
            .map(|p| self.nodes.read().contains_key(&p))
            .unwrap_or(false)
    }

    fn publish(&self, events: Vec<RegistryEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get_value(&self, path: &str) -> RegistryResult<(Vec<u8>, Version)> {
        let path = normalize(path)?;
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            Some(Node {
                value: Some(value),
                version,
                ..
            }) => Ok((value.clone(), *version)),
            _ => Err(RegistryError::NotFound(path)),
        }
    }

    async fn get_children(&self, path: &str) -> RegistryResult<(Vec<String>, Version)> {
        let path = normalize(path)?;
        let nodes = self.nodes.read();
        nodes
            .get(&path)
            .map(|node| (node.children.clone(), node.children_version))
            .ok_or(RegistryError::NotFound(path))
    }

    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}

fn normalize(path: &str) -> RegistryResult<String> {
    if !path.starts_with('/') {
        return Err(RegistryError::InvalidPath(format!(
            "{} (must be absolute)",
            path
        )));
    }
    Ok(join(&[path]))
}

fn ensure_node(nodes: &mut HashMap<String, Node>, path: &str, events: &mut Vec<RegistryEvent>) {
    if nodes.contains_key(path) {
        return;
    }
    if let Some(parent_path) = parent(path) {
        ensure_node(nodes, parent_path, events);
        if let Some(p) = nodes.get_mut(parent_path) {
            p.children.push(base_name(path).to_string());
            p.children_version = p.children_version.wrapping_add(1);
        }
        events.push(RegistryEvent::new(parent_path, EventKind::ChildrenChanged));
    }
    nodes.insert(path.to_string(), Node::default());
}
