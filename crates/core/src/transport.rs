#![warn(missing_docs)]
//! Remote call primitive used by [Swarm](crate::swarm::Swarm).

use async_trait::async_trait;

use crate::dht::Node;
use crate::error::Result;
use crate::message::Payload;
use crate::message::Response;

/// A transport executes one request/response exchange with a peer.
///
/// Implementations must bound every call with a timeout and report unreachable or
/// silent peers as a transport failure, see [Error::is_transport_failure](crate::error::Error::is_transport_failure).
/// There is no retry inside a call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `payload` to `target` and wait for its response.
    async fn call(&self, target: &Node, payload: Payload) -> Result<Response>;
}

#[cfg(any(test, feature = "dummy"))]
pub use memory::MemoryHub;
#[cfg(any(test, feature = "dummy"))]
pub use memory::MemoryTransport;

#[cfg(any(test, feature = "dummy"))]
mod memory {
    use std::sync::Arc;
    use std::sync::Weak;

    use async_trait::async_trait;
    use dashmap::DashMap;
    use dashmap::DashSet;

    use super::Transport;
    use crate::dht::Node;
    use crate::error::Error;
    use crate::error::Result;
    use crate::message::Payload;
    use crate::message::Response;
    use crate::swarm::Swarm;

    /// Registry of in-process swarms, addressed by `host:port`.
    #[derive(Default)]
    pub struct MemoryHub {
        swarms: DashMap<String, Weak<Swarm>>,
        offline: DashSet<String>,
    }

    /// Transport delivering calls to swarms registered in a [MemoryHub].
    #[derive(Clone)]
    pub struct MemoryTransport {
        hub: Arc<MemoryHub>,
    }

    impl MemoryHub {
        /// Create an empty hub.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Transport bound to this hub.
        pub fn transport(self: &Arc<Self>) -> Arc<MemoryTransport> {
            Arc::new(MemoryTransport { hub: self.clone() })
        }

        /// Make a swarm reachable at the address of its node.
        pub fn register(&self, swarm: &Arc<Swarm>) {
            self.swarms
                .insert(swarm.node().address(), Arc::downgrade(swarm));
        }

        /// Simulate a crash: calls to the node fail as unreachable.
        pub fn set_offline(&self, node: &Node) {
            self.offline.insert(node.address());
        }

        /// Bring a node back.
        pub fn set_online(&self, node: &Node) {
            self.offline.remove(&node.address());
        }

        fn lookup(&self, node: &Node) -> Option<Arc<Swarm>> {
            let address = node.address();
            if self.offline.contains(&address) {
                return None;
            }
            self.swarms.get(&address).and_then(|w| w.upgrade())
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn call(&self, target: &Node, payload: Payload) -> Result<Response> {
            let swarm = self
                .hub
                .lookup(target)
                .ok_or_else(|| Error::PeerUnreachable(target.address()))?;
            Ok(swarm.handle_payload(payload).await)
        }
    }
}
