use conf_registry::Registry;
use tracing::debug;

use super::node::ClusterNode;
use crate::error::ClusterError;

/// Ordered membership built from one children listing.
///
/// Master election is purely ordinal: the node listed first wins. This is
/// only correct when the registry returns siblings in creation order, as
/// ZooKeeper does for sequential ephemeral nodes. A registry that reorders
/// listings breaks election for every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterView {
    nodes: Vec<ClusterNode>,
    self_server_id: String,
}

impl ClusterView {
    /// Parse `names` in listing order. The first malformed name fails the
    /// whole build since it would shift every later ordinal.
    pub fn build<I, S>(names: I, self_server_id: impl Into<String>) -> Result<Self, ClusterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = names
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| ClusterNode::parse(name.as_ref(), ordinal))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes,
            self_server_id: self_server_id.into(),
        })
    }

    /// List `cluster_path` and build the view from its children
    pub async fn fetch<R>(
        registry: &R,
        cluster_path: &str,
        self_server_id: impl Into<String>,
    ) -> Result<Self, ClusterError>
    where
        R: Registry + ?Sized,
    {
        let (names, version) = registry.get_children(cluster_path).await?;
        debug!(
            path = cluster_path,
            version,
            members = names.len(),
            "Fetched cluster membership"
        );
        Self::build(names, self_server_id)
    }

    pub fn self_server_id(&self) -> &str {
        &self.self_server_id
    }

    /// True if `node` sits ahead of position `index`
    pub fn is_master(&self, node: &ClusterNode, index: usize) -> bool {
        node.is_master(index)
    }

    /// True if `node` is this process
    pub fn is_current(&self, node: &ClusterNode) -> bool {
        node.server_id() == self.self_server_id
    }

    pub fn is_available(&self, node: &ClusterNode) -> bool {
        node.is_available()
    }

    /// Node with ordinal 0
    pub fn master(&self) -> Option<&ClusterNode> {
        self.nodes.first()
    }

    /// This process's own registration, if listed
    pub fn current(&self) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| self.is_current(n))
    }

    /// True if this process holds ordinal 0
    pub fn is_current_master(&self) -> bool {
        self.master().is_some_and(|n| self.is_current(n))
    }

    pub fn get(&self, ordinal: usize) -> Option<&ClusterNode> {
        self.nodes.get(ordinal)
    }

    pub fn find(&self, raw_name: &str) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| n.raw_name() == raw_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use conf_registry::MemoryRegistry;

    use super::*;

    #[test]
    fn test_ordinal_election() {
        let view = ClusterView::build(["n0_a", "n1_b", "n2_c"], "b").unwrap();
        let n0 = view.get(0).unwrap();
        let n1 = view.get(1).unwrap();
        let n2 = view.get(2).unwrap();

        assert!(view.is_master(n0, n1.ordinal()));
        assert!(view.is_master(n0, n2.ordinal()));
        assert!(view.is_master(n1, n2.ordinal()));
        assert!(!view.is_master(n2, n0.ordinal()));
        assert!(!view.is_master(n2, n1.ordinal()));
        assert!(!view.is_master(n2, n2.ordinal()));
        assert_eq!(view.master(), Some(n0));
    }

    #[test]
    fn test_self_identity() {
        let view = ClusterView::build(["h1_s1", "h2_s2", "h3_s3"], "s2").unwrap();
        let h1 = view.find("h1_s1").unwrap();
        let h2 = view.find("h2_s2").unwrap();
        let h3 = view.find("h3_s3").unwrap();

        assert!(view.is_master(h1, h2.ordinal()));
        assert!(view.is_current(h2));
        assert!(!view.is_current(h3));
        assert!(!view.is_current(h1));
        assert_eq!(view.current(), Some(h2));
        assert!(!view.is_current_master());
    }

    #[test]
    fn test_malformed_name_fails_build() {
        let err = ClusterView::build(["h1_s1", "broken", "h3_s3"], "s1").unwrap_err();
        assert!(matches!(err, ClusterError::MalformedNode(n) if n == "broken"));
    }

    #[test]
    fn test_empty_view() {
        let view = ClusterView::build(Vec::<String>::new(), "s1").unwrap();
        assert!(view.is_empty());
        assert!(view.master().is_none());
        assert!(view.current().is_none());
        assert!(!view.is_current_master());
        assert!(!view.is_available(&ClusterNode::default()));
    }

    #[tokio::test]
    async fn test_fetch_uses_registry_order() {
        let registry = MemoryRegistry::new();
        for name in ["h2_s2", "h1_s1"] {
            registry
                .create_or_update(&format!("/p/s/api/c/servers/{}", name), "")
                .unwrap();
        }

        let view = ClusterView::fetch(&registry, "/p/s/api/c/servers", "s2")
            .await
            .unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.master().unwrap().raw_name(), "h2_s2");
        assert!(view.is_current_master());
        assert_eq!(view.self_server_id(), "s2");
    }

    #[tokio::test]
    async fn test_fetch_missing_path() {
        let registry = MemoryRegistry::new();
        let err = ClusterView::fetch(&registry, "/p/s/api/c/servers", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Registry(_)));
    }
}
