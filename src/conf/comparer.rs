//! Version-gated, content-confirmed change detection between two trees.
//!
//! The comparer keeps two slots: the tree accepted as in effect and the
//! latest candidate. [`SnapshotComparer::update`] shifts the previous
//! candidate into the accepted slot, so calling `update` once per poll and
//! then querying the predicates always compares consecutive fetches.

use std::sync::Arc;

use arc_swap::ArcSwap;
use conf_registry::Version;
use serde_json::Value;
use tracing::debug;

use super::{
    snapshot::{ConfigSnapshot, Signature},
    tree::ConfigTree,
};

#[derive(Debug, Default)]
struct Slots {
    accepted: Option<Arc<ConfigTree>>,
    candidate: Option<Arc<ConfigTree>>,
}

impl Slots {
    fn accepted_root(&self) -> Option<&ConfigSnapshot> {
        self.accepted.as_deref().and_then(ConfigTree::root)
    }

    fn candidate_root(&self) -> Option<&ConfigSnapshot> {
        self.candidate.as_deref().and_then(ConfigTree::root)
    }

    fn is_changed(&self) -> bool {
        match (self.accepted_root(), self.candidate_root()) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            // Equal versions are taken as proof of no change; differing
            // versions still need differing bytes.
            (Some(a), Some(c)) => a.version() != c.version() && a.signature() != c.signature(),
        }
    }

    /// Candidate must be strictly newer than accepted. An absent side sorts
    /// below every version, so an absent candidate never passes.
    fn passes_version_gate(&self) -> bool {
        let accepted: Option<Version> = self.accepted.as_deref().and_then(ConfigTree::version);
        let candidate: Option<Version> = self.candidate.as_deref().and_then(ConfigTree::version);
        candidate > accepted
    }

    fn is_sub_conf_changed<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        if !self.passes_version_gate() {
            return false;
        }
        names.into_iter().any(|name| {
            let sig = |tree: &Option<Arc<ConfigTree>>| -> Option<Signature> {
                tree.as_deref()
                    .and_then(|t| t.child(name))
                    .map(ConfigSnapshot::signature)
            };
            sig(&self.accepted) != sig(&self.candidate)
        })
    }

    fn is_value_changed<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        if !self.passes_version_gate() {
            return false;
        }
        let (accepted, candidate) = (self.accepted_root(), self.candidate_root());
        names.into_iter().any(|name| {
            let before: Option<&Value> = accepted.and_then(|r| r.get(name));
            let after: Option<&Value> = candidate.and_then(|r| r.get(name));
            before != after
        })
    }
}

/// Summary of the three predicates against the watched names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Whole configuration changed
    pub conf: bool,
    /// At least one watched sub-configuration changed
    pub sub_confs: bool,
    /// At least one watched root value changed
    pub values: bool,
}

impl ChangeSet {
    pub fn any(&self) -> bool {
        self.conf || self.sub_confs || self.values
    }
}

/// Decides whether a freshly loaded tree is a real change.
///
/// Both slots live in one `ArcSwap`, so a reader never observes a new
/// candidate paired with a stale accepted tree.
#[derive(Debug)]
pub struct SnapshotComparer {
    slots: ArcSwap<Slots>,
    watched_values: Vec<String>,
    watched_sub_confs: Vec<String>,
}

impl SnapshotComparer {
    pub fn new(watched_values: Vec<String>, watched_sub_confs: Vec<String>) -> Self {
        Self {
            slots: ArcSwap::from_pointee(Slots::default()),
            watched_values,
            watched_sub_confs,
        }
    }

    pub fn watched_values(&self) -> &[String] {
        &self.watched_values
    }

    pub fn watched_sub_confs(&self) -> &[String] {
        &self.watched_sub_confs
    }

    /// Promote the current candidate (if any) to accepted and install `tree`
    /// as the new candidate.
    pub fn update(&self, tree: impl Into<Arc<ConfigTree>>) {
        let tree = tree.into();
        debug!(
            path = tree.main_path(),
            version = ?tree.version(),
            "Installing configuration candidate"
        );
        self.slots.rcu(|current| Slots {
            accepted: current
                .candidate
                .clone()
                .or_else(|| current.accepted.clone()),
            candidate: Some(tree.clone()),
        });
    }

    pub fn accepted(&self) -> Option<Arc<ConfigTree>> {
        self.slots.load().accepted.clone()
    }

    pub fn candidate(&self) -> Option<Arc<ConfigTree>> {
        self.slots.load().candidate.clone()
    }

    /// Whole-tree change: presence flip, or new version with new bytes
    pub fn is_changed(&self) -> bool {
        self.slots.load().is_changed()
    }

    /// Whether any named sub-configuration changed. With no names the
    /// watched sub-configuration list is used.
    pub fn is_sub_conf_changed(&self, names: &[&str]) -> bool {
        let slots = self.slots.load();
        if names.is_empty() {
            slots.is_sub_conf_changed(self.watched_sub_confs.iter().map(String::as_str))
        } else {
            slots.is_sub_conf_changed(names.iter().copied())
        }
    }

    /// Whether any named root value changed. With no names the watched
    /// value list is used.
    pub fn is_value_changed(&self, names: &[&str]) -> bool {
        let slots = self.slots.load();
        if names.is_empty() {
            slots.is_value_changed(self.watched_values.iter().map(String::as_str))
        } else {
            slots.is_value_changed(names.iter().copied())
        }
    }

    /// Evaluate all three predicates on one consistent pair of slots
    pub fn changes(&self) -> ChangeSet {
        let slots = self.slots.load();
        ChangeSet {
            conf: slots.is_changed(),
            sub_confs: slots.is_sub_conf_changed(self.watched_sub_confs.iter().map(String::as_str)),
            values: slots.is_value_changed(self.watched_values.iter().map(String::as_str)),
        }
    }
}

impl Default for SnapshotComparer {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
