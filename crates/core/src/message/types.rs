#![warn(missing_docs)]
//! This module defines the requests a node answers and their responses.
//! Every request is answered by exactly one response, there is no fire-and-forget message.

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::Node;
use crate::dht::NodeLink;
use crate::inspect::DHTInspect;

/// Remote-callable operations of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Ask for the identity of the node. Doubles as a liveness probe.
    GetInfo,
    /// Initialize a singleton ring.
    Create,
    /// Join the ring through an introducer.
    Join(Node),
    /// Resolve the owner of a did.
    FindSuccessor {
        /// did of target
        did: Did,
        /// forwarding hops taken so far
        hops: u32,
    },
    /// Ask for the current predecessor.
    GetPredecessor,
    /// Propose a node as predecessor.
    Notify(Node),
    /// Ask for a status snapshot.
    Inspect,
}

/// Answers to [Request].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Identity of the node.
    Info(Node),
    /// Operation finished without result.
    Done,
    /// Owner of the requested did.
    Successor(Node),
    /// Current predecessor, possibly unknown.
    Predecessor(NodeLink),
    /// Status snapshot.
    Inspect(DHTInspect),
    /// Lookup was forwarded more than the hop bound allows.
    LookupFailed {
        /// hops taken when the lookup was stopped
        hops: u32,
    },
    /// Request failed on the remote side.
    Error(String),
}

impl Request {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetInfo => "get_info",
            Self::Create => "create",
            Self::Join(_) => "join",
            Self::FindSuccessor { .. } => "find_successor",
            Self::GetPredecessor => "get_predecessor",
            Self::Notify(_) => "notify",
            Self::Inspect => "inspect",
        }
    }
}
