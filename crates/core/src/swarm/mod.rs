#![warn(missing_docs)]
//! Glue between [PeerRing] and a [Transport].
//!
//! [PeerRing] only decides, the swarm executes: it runs the remote calls described by
//! [PeerRingAction], resolves lookups recursively with a hop bound, and answers the
//! requests of other nodes.

mod builder;

use std::sync::Arc;

pub use builder::SwarmBuilder;

use crate::dht::Chord;
use crate::dht::Did;
use crate::dht::Node;
use crate::dht::NodeLink;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::dht::RingParams;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::DHTInspect;
use crate::message::Payload;
use crate::message::Request;
use crate::message::Response;
use crate::transport::Transport;

/// The transport and dht management.
pub struct Swarm {
    /// Reference of DHT.
    pub(crate) dht: Arc<PeerRing>,
    pub(crate) transport: Arc<dyn Transport>,
    max_lookup_hops: u32,
}

impl Swarm {
    /// Get did of self.
    pub fn did(&self) -> Did {
        self.dht.did()
    }

    /// Get identity of self.
    pub fn node(&self) -> &Node {
        &self.dht.node
    }

    /// Ring constants of self.
    pub fn params(&self) -> RingParams {
        self.dht.params
    }

    /// Get DHT(Distributed Hash Table) of self.
    pub fn dht(&self) -> Arc<PeerRing> {
        self.dht.clone()
    }

    /// Maximum forwarding hops of a lookup.
    pub fn max_lookup_hops(&self) -> u32 {
        self.max_lookup_hops
    }

    /// A node reported by a peer must lie on our ring.
    fn checked(&self, node: Node) -> Result<Node> {
        self.params().check(node.did)?;
        Ok(node)
    }

    async fn call(&self, target: &Node, request: Request) -> Result<Response> {
        tracing::debug!("call {} on {}", request.name(), target);
        self.transport
            .call(target, Payload::new(self.params(), request))
            .await
    }

    /// Ask `target` for its identity. Used as liveness probe.
    pub async fn get_info(&self, target: &Node) -> Result<Node> {
        match self.call(target, Request::GetInfo).await? {
            Response::Info(node) => self.checked(node),
            resp => Err(unexpected(resp)),
        }
    }

    /// Ask `target` for its predecessor.
    pub async fn get_predecessor(&self, target: &Node) -> Result<NodeLink> {
        match self.call(target, Request::GetPredecessor).await? {
            Response::Predecessor(pred) => pred.map(|n| self.checked(n)).transpose(),
            resp => Err(unexpected(resp)),
        }
    }

    /// Propose `candidate` as predecessor of `target`.
    pub async fn notify(&self, target: &Node, candidate: Node) -> Result<()> {
        match self.call(target, Request::Notify(candidate)).await? {
            Response::Done => Ok(()),
            resp => Err(unexpected(resp)),
        }
    }

    /// Ask `target` to resolve the owner of `did`, `hops` forwards taken so far.
    pub async fn remote_find_successor(&self, target: &Node, did: Did, hops: u32) -> Result<Node> {
        match self
            .call(target, Request::FindSuccessor { did, hops })
            .await?
        {
            Response::Successor(node) => self.checked(node),
            Response::LookupFailed { hops } => Err(Error::LookupHopsExceeded(hops)),
            resp => Err(unexpected(resp)),
        }
    }

    /// Start a singleton ring.
    pub fn create(&self) -> Result<()> {
        self.dht.create()
    }

    /// Join the ring of `introducer`. The node stays uninitialized if the introducer
    /// cannot resolve our successor, so the join may be retried.
    pub async fn join(&self, introducer: Node) -> Result<()> {
        match self.dht.join(introducer)? {
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessor(did)) => {
                let successor = self.remote_find_successor(&next, did, 0).await?;
                self.dht.complete_join(successor)
            }
            act => Err(Error::InvalidAction(format!("{:?}", act))),
        }
    }

    /// Resolve the node owning `did`, forwarding through the ring as needed.
    pub async fn find_successor(&self, did: Did) -> Result<Node> {
        self.lookup(did, 0).await
    }

    async fn lookup(&self, did: Did, hops: u32) -> Result<Node> {
        if hops > self.max_lookup_hops {
            return Err(Error::LookupHopsExceeded(hops));
        }
        match self.dht.find_successor(did)? {
            PeerRingAction::Some(node) => Ok(node),
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessor(did)) => {
                match self.remote_find_successor(&next, did, hops + 1).await {
                    Ok(node) => Ok(node),
                    Err(e) if e.is_transport_failure() => {
                        tracing::warn!(
                            "find_successor({}) forward to {} failed: {}, answer with self",
                            did,
                            next,
                            e
                        );
                        self.dht.remove_finger(next.did)?;
                        Ok(self.node().clone())
                    }
                    Err(e) => Err(e),
                }
            }
            act => Err(Error::InvalidAction(format!("{:?}", act))),
        }
    }

    /// Status snapshot of self.
    pub fn inspect(&self) -> Result<DHTInspect> {
        DHTInspect::inspect(&self.dht)
    }

    /// Answer a request of another node. Never fails: errors are reported to the caller
    /// inside the response.
    pub async fn handle_payload(&self, payload: Payload) -> Response {
        let local = self.params();
        if payload.params != local {
            let err = Error::RingParamsMismatch {
                local,
                remote: payload.params,
            };
            tracing::warn!("refuse {}: {}", payload.request.name(), err);
            return Response::Error(err.to_string());
        }

        let name = payload.request.name();
        match self.handle_request(payload.request).await {
            Ok(resp) => resp,
            Err(Error::LookupHopsExceeded(hops)) => {
                tracing::warn!("lookup stopped after {} hops", hops);
                Response::LookupFailed { hops }
            }
            Err(e) => {
                tracing::warn!("failed to handle {}: {}", name, e);
                Response::Error(e.to_string())
            }
        }
    }

    async fn handle_request(&self, request: Request) -> Result<Response> {
        let resp = match request {
            Request::GetInfo => Response::Info(self.node().clone()),
            Request::Create => {
                self.create()?;
                Response::Done
            }
            Request::Join(introducer) => {
                self.join(introducer).await?;
                Response::Done
            }
            Request::FindSuccessor { did, hops } => Response::Successor(self.lookup(did, hops).await?),
            Request::GetPredecessor => Response::Predecessor(self.dht.predecessor()?),
            Request::Notify(candidate) => {
                self.dht.notify(candidate)?;
                Response::Done
            }
            Request::Inspect => Response::Inspect(self.inspect()?),
        };
        Ok(resp)
    }
}

fn unexpected(resp: Response) -> Error {
    match resp {
        Response::Error(e) => Error::RemoteError(e),
        resp => Error::UnexpectedResponse(format!("{:?}", resp)),
    }
}
