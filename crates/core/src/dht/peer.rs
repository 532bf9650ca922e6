//! A participant of the ring.
#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use super::did::Did;

/// Node is the identity of a ring participant: its position on the ring and the
/// address it answers remote calls on. Immutable once assigned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Position on the ring.
    pub did: Did,
    /// Host to reach the node.
    pub host: String,
    /// Port to reach the node.
    pub port: u16,
}

/// Optional reference to a node. `None` means the link is unknown.
pub type NodeLink = Option<Node>;

impl Node {
    /// Create a node identity.
    pub fn new(did: impl Into<Did>, host: impl Into<String>, port: u16) -> Self {
        Self {
            did: did.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port` of the node, used to reach it.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.did, self.host, self.port)
    }
}
