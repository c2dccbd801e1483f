use crate::error::ClusterError;

/// Separator between host and server id in a registration name
pub const NODE_NAME_SEPARATOR: char = '_';

/// Registration name for an instance: `<host>_<serverID>`
pub fn node_name(host: &str, server_id: &str) -> String {
    format!("{}{}{}", host, NODE_NAME_SEPARATOR, server_id)
}

/// One sibling registration under a cluster's servers path.
///
/// `ordinal` is the position within the listing the node was parsed from.
/// It is not a stable identity and must be recomputed on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClusterNode {
    raw_name: String,
    host: String,
    server_id: String,
    ordinal: usize,
}

impl ClusterNode {
    /// Split `raw_name` on the first separator. Names without a separator,
    /// or with an empty host or server id, are rejected.
    pub fn parse(raw_name: &str, ordinal: usize) -> Result<Self, ClusterError> {
        match raw_name.split_once(NODE_NAME_SEPARATOR) {
            Some((host, server_id)) if !host.is_empty() && !server_id.is_empty() => Ok(Self {
                raw_name: raw_name.to_string(),
                host: host.to_string(),
                server_id: server_id.to_string(),
                ordinal,
            }),
            _ => Err(ClusterError::MalformedNode(raw_name.to_string())),
        }
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// False for default-constructed descriptors
    pub fn is_available(&self) -> bool {
        !self.raw_name.is_empty()
    }

    /// True if this node sits ahead of position `index` in its listing
    pub fn is_master(&self, index: usize) -> bool {
        self.ordinal < index
    }
}
