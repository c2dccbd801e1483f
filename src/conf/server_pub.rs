use conf_registry::join;
use serde::{Deserialize, Serialize};

/// Identity of a service cluster inside the registry.
///
/// Layout: `/{platform}/{system}/{server_type}/{cluster}/conf` holds the
/// main configuration (sub-configurations are its children) and
/// `/{platform}/{system}/{server_type}/{cluster}/servers` holds one
/// registration node per running instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerPub {
    pub platform: String,
    pub system: String,
    pub server_type: String,
    pub cluster: String,
}

impl ServerPub {
    pub fn new(
        platform: impl Into<String>,
        system: impl Into<String>,
        server_type: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            system: system.into(),
            server_type: server_type.into(),
            cluster: cluster.into(),
        }
    }

    fn cluster_root(&self) -> String {
        join(&[
            self.platform.as_str(),
            self.system.as_str(),
            self.server_type.as_str(),
            self.cluster.as_str(),
        ])
    }

    pub fn main_path(&self) -> String {
        join(&[self.cluster_root().as_str(), "conf"])
    }

    pub fn sub_conf_path(&self, name: &str) -> String {
        join(&[self.main_path().as_str(), name])
    }

    pub fn server_pub_path(&self) -> String {
        join(&[self.cluster_root().as_str(), "servers"])
    }

    /// Registration path of one instance under the servers directory
    pub fn node_path(&self, host: &str, server_id: &str) -> String {
        join(&[
            self.server_pub_path().as_str(),
            crate::cluster::node_name(host, server_id).as_str(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let sp = ServerPub::new("hydra", "apiserver", "api", "t");
        assert_eq!(sp.main_path(), "/hydra/apiserver/api/t/conf");
        assert_eq!(sp.sub_conf_path("mqc"), "/hydra/apiserver/api/t/conf/mqc");
        assert_eq!(sp.server_pub_path(), "/hydra/apiserver/api/t/servers");
        assert_eq!(
            sp.node_path("192.168.0.1", "a1b2"),
            "/hydra/apiserver/api/t/servers/192.168.0.1_a1b2"
        );
    }
}
