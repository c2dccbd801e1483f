//! Cluster membership from sibling registration names
//!
//! Election needs no RPC between nodes: every instance lists the same
//! servers directory and agrees that the first entry is master.

mod node;
mod view;

pub use node::{node_name, ClusterNode, NODE_NAME_SEPARATOR};
pub use view::ClusterView;
