#![warn(missing_docs)]
//! This module provider [SwarmBuilder] and it's interface for
//! [Swarm]

use std::sync::Arc;

use crate::consts::DEFAULT_MAX_LOOKUP_HOPS;
use crate::dht::Node;
use crate::dht::PeerRing;
use crate::dht::RingParams;
use crate::error::Result;
use crate::swarm::Swarm;
use crate::transport::Transport;

/// Creates a SwarmBuilder to configure a Swarm.
pub struct SwarmBuilder {
    node: Node,
    params: RingParams,
    max_lookup_hops: u32,
    transport: Arc<dyn Transport>,
}

impl SwarmBuilder {
    /// Creates new instance of [SwarmBuilder]
    pub fn new(node: Node, transport: Arc<dyn Transport>) -> Self {
        SwarmBuilder {
            node,
            params: RingParams::default(),
            max_lookup_hops: DEFAULT_MAX_LOOKUP_HOPS,
            transport,
        }
    }

    /// Sets up the ring constants, they must match every other participant.
    pub fn params(mut self, params: RingParams) -> Self {
        self.params = params;
        self
    }

    /// Sets up the maximum forwarding hops of a lookup.
    pub fn max_lookup_hops(mut self, hops: u32) -> Self {
        self.max_lookup_hops = hops;
        self
    }

    /// Try build for `Swarm`.
    pub fn build(self) -> Result<Swarm> {
        let dht = Arc::new(PeerRing::new(self.node, self.params)?);
        Ok(Swarm {
            dht,
            transport: self.transport,
            max_lookup_hops: self.max_lookup_hops,
        })
    }
}
