//! Chord algorithm implement.
#![warn(missing_docs)]
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use super::types::Chord;
use super::FingerTable;
use crate::dht::Did;
use crate::dht::Node;
use crate::dht::NodeLink;
use crate::dht::RingParams;
use crate::error::Error;
use crate::error::Result;

/// Lifecycle of a node. `create` or `join` moves it to `Active` exactly once and
/// there is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Process started, not part of any ring yet.
    Uninitialized,
    /// Member of a ring.
    Active,
}

/// Mutable ring state of a node. Guarded as a whole by one lock so no reader ever
/// observes a partially updated `{successor, predecessor, finger}` tuple.
#[derive(Clone, Debug)]
pub struct RingState {
    /// Lifecycle status.
    pub status: NodeStatus,
    /// The next node on the ring. Only a node alone may point at itself.
    pub successor: NodeLink,
    /// The previous node on the ring, frequently unknown.
    pub predecessor: NodeLink,
    /// [FingerTable] help node to find successor quickly.
    pub finger: FingerTable,
}

/// PeerRing is used to help a node interact with other nodes.
/// All nodes form a clockwise ring in the order of [Did].
/// This struct takes its name from that.
/// PeerRing implemented [Chord] algorithm.
pub struct PeerRing {
    /// Identity of current node.
    pub node: Node,
    /// Ring-wide constants.
    pub params: RingParams,
    state: Mutex<RingState>,
}

/// `PeerRing` use this to describe the result of [Chord] algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerRingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Found some node.
    Some(Node),
    /// Trigger a remote action on the node.
    RemoteAction(Node, RemoteAction),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
///
/// To avoid ambiguity, in the following comments, `node_a` is the node declared in
/// [PeerRingAction::RemoteAction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Need `node_a` to find the successor of did.
    FindSuccessor(Did),
    /// Let `node_a` consider the node as its predecessor.
    Notify(Node),
}

impl PeerRing {
    /// Create the ring state of `node`, uninitialized until `create` or `join`.
    pub fn new(node: Node, params: RingParams) -> Result<Self> {
        params.validate()?;
        params.check(node.did)?;
        let finger = FingerTable::new(node.did, params.finger_table_size as usize);
        Ok(Self {
            node,
            params,
            state: Mutex::new(RingState {
                status: NodeStatus::Uninitialized,
                successor: None,
                predecessor: None,
                finger,
            }),
        })
    }

    /// Did of current node.
    pub fn did(&self) -> Did {
        self.node.did
    }

    /// Lock and return MutexGuard of the ring state.
    pub fn lock_state(&self) -> Result<MutexGuard<'_, RingState>> {
        self.state.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Copy of the whole ring state.
    pub fn snapshot(&self) -> Result<RingState> {
        Ok(self.lock_state()?.clone())
    }

    /// Lifecycle status.
    pub fn status(&self) -> Result<NodeStatus> {
        Ok(self.lock_state()?.status)
    }

    /// Returns `true` once `create` or `join` succeeded.
    pub fn is_active(&self) -> Result<bool> {
        Ok(self.status()? == NodeStatus::Active)
    }

    /// Current successor.
    pub fn successor(&self) -> Result<NodeLink> {
        Ok(self.lock_state()?.successor.clone())
    }

    /// Current predecessor.
    pub fn predecessor(&self) -> Result<NodeLink> {
        Ok(self.lock_state()?.predecessor.clone())
    }

    /// Start of the `index`-th finger interval of current node.
    pub fn finger_start(&self, index: usize) -> Did {
        self.params.finger_start(self.did(), index)
    }

    /// Set a finger table entry.
    pub fn set_finger(&self, index: usize, node: NodeLink) -> Result<()> {
        self.lock_state()?.finger.set(index, node);
        Ok(())
    }

    /// Finish a join with the successor resolved by the introducer.
    pub fn complete_join(&self, successor: Node) -> Result<()> {
        self.params.check(successor.did)?;
        let mut state = self.lock_state()?;
        if state.status == NodeStatus::Active {
            return Err(Error::AlreadyActive);
        }
        tracing::info!("node {} joined, successor: {}", self.node, successor);
        state.successor = Some(successor);
        state.status = NodeStatus::Active;
        Ok(())
    }

    /// Clear the successor if it still points at `did`, and drop `did` from finger table.
    /// Returns `true` if the successor was cleared.
    pub fn invalidate_successor(&self, did: Did) -> Result<bool> {
        let mut state = self.lock_state()?;
        state.finger.remove(did);
        match &state.successor {
            Some(succ) if succ.did == did && did != self.did() => {
                tracing::info!("node {} lost successor {}", self.node, did);
                state.successor = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Clear the predecessor if it still points at `did`.
    /// Returns `true` if the predecessor was cleared.
    pub fn invalidate_predecessor(&self, did: Did) -> Result<bool> {
        let mut state = self.lock_state()?;
        match &state.predecessor {
            Some(pred) if pred.did == did => {
                tracing::info!("node {} lost predecessor {}", self.node, did);
                state.predecessor = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove a node from finger table.
    pub fn remove_finger(&self, did: Did) -> Result<()> {
        self.lock_state()?.finger.remove(did);
        Ok(())
    }

    /// A node without successor adopts its closest known finger, then its predecessor,
    /// and finally itself. Returns the adopted successor, if any repair happened.
    pub fn repair_successor(&self) -> Result<NodeLink> {
        let mut state = self.lock_state()?;
        if state.status != NodeStatus::Active || state.successor.is_some() {
            return Ok(None);
        }
        let candidate = state
            .finger
            .first()
            .cloned()
            .or_else(|| state.predecessor.clone())
            .unwrap_or_else(|| self.node.clone());
        tracing::info!(
            "node {} repaired successor with {}",
            self.node,
            candidate
        );
        state.successor = Some(candidate.clone());
        Ok(Some(candidate))
    }

    fn ensure_active(state: &RingState) -> Result<()> {
        if state.status != NodeStatus::Active {
            return Err(Error::NotActive);
        }
        Ok(())
    }
}

impl Chord<PeerRingAction> for PeerRing {
    /// Start a singleton ring: predecessor unknown, successor is self.
    fn create(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if state.status == NodeStatus::Active {
            return Err(Error::AlreadyActive);
        }
        state.predecessor = None;
        state.successor = Some(self.node.clone());
        state.status = NodeStatus::Active;
        tracing::info!("node {} created a new ring", self.node);
        Ok(())
    }

    /// Join a ring containing `introducer`.
    ///
    /// This method will return a [RemoteAction::FindSuccessor] for our own did.
    /// The caller sends it to the introducer and finishes with
    /// [complete_join](PeerRing::complete_join). Predecessor and finger table are
    /// left to converge through stabilization.
    fn join(&self, introducer: Node) -> Result<PeerRingAction> {
        self.params.check(introducer.did)?;
        if introducer.did == self.did() {
            return Err(Error::JoinSelf);
        }
        let mut state = self.lock_state()?;
        if state.status == NodeStatus::Active {
            return Err(Error::AlreadyActive);
        }
        state.predecessor = None;
        Ok(PeerRingAction::RemoteAction(
            introducer,
            RemoteAction::FindSuccessor(self.did()),
        ))
    }

    /// Find the successor of a did.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<PeerRingAction> {
        let did = self.params.check(did)?;
        let state = self.lock_state()?;
        Self::ensure_active(&state)?;

        // A node owns its own did.
        if did == self.did() {
            return Ok(PeerRingAction::Some(self.node.clone()));
        }

        if let Some(succ) = &state.successor {
            // If the did lies in (self, successor], the successor owns it.
            if self
                .params
                .is_between_clockwise(self.did(), did, succ.did, true)
            {
                return Ok(PeerRingAction::Some(succ.clone()));
            }
        }

        // Otherwise, find the closest preceding node and ask it to find the successor.
        // Without a useful finger fall back to the successor.
        let next = state
            .finger
            .closest_preceding_node(&self.params, did)
            .or(state.successor.as_ref())
            .filter(|n| n.did != self.did())
            .cloned();

        let ret = match next {
            Some(n) => PeerRingAction::RemoteAction(n, RemoteAction::FindSuccessor(did)),
            None => PeerRingAction::Some(self.node.clone()),
        };

        tracing::debug!(
            "find_successor: self: {}, did: {}, successor: {:?}, result: {:?}",
            self.did(),
            did,
            state.successor.as_ref().map(|n| n.did),
            ret
        );
        Ok(ret)
    }

    fn closest_preceding_node(&self, did: Did) -> Result<Node> {
        let state = self.lock_state()?;
        Ok(state
            .finger
            .closest_preceding_node(&self.params, did)
            .cloned()
            .unwrap_or_else(|| self.node.clone()))
    }

    /// Handle notification from a node that thinks it is the predecessor of current node.
    /// If the candidate lies between the current predecessor and self, or current node
    /// has no predecessor, adopt it. Returns the predecessor after update.
    fn notify(&self, candidate: Node) -> Result<NodeLink> {
        self.params.check(candidate.did)?;
        let mut state = self.lock_state()?;
        if candidate.did == self.did() {
            return Ok(state.predecessor.clone());
        }
        let accept = match &state.predecessor {
            None => true,
            Some(pred) => {
                self.params
                    .is_between_clockwise(pred.did, candidate.did, self.did(), false)
            }
        };
        if accept && state.predecessor.as_ref() != Some(&candidate) {
            tracing::info!("node {} adopted predecessor {}", self.node, candidate);
            state.predecessor = Some(candidate);
        }
        Ok(state.predecessor.clone())
    }

    /// Adopt `x` as successor if it lies strictly between self and the successor, then
    /// ask the successor to consider self as its predecessor.
    fn stabilize(&self, x: NodeLink) -> Result<PeerRingAction> {
        let mut state = self.lock_state()?;
        if state.status != NodeStatus::Active {
            return Ok(PeerRingAction::None);
        }
        let Some(succ) = state.successor.clone() else {
            return Ok(PeerRingAction::None);
        };
        let succ = match x {
            Some(x)
                if self
                    .params
                    .is_between_clockwise(self.did(), x.did, succ.did, false)
                    && x.did != self.did() =>
            {
                tracing::info!("node {} adopted successor {}", self.node, x);
                state.successor = Some(x.clone());
                x
            }
            _ => succ,
        };
        if succ.did == self.did() {
            return Ok(PeerRingAction::None);
        }
        Ok(PeerRingAction::RemoteAction(
            succ,
            RemoteAction::Notify(self.node.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> Node {
        Node::new(id, "127.0.0.1", 5000 + id as u16)
    }

    fn ring(id: u64) -> PeerRing {
        PeerRing::new(node(id), RingParams::new(1024, 10).unwrap()).unwrap()
    }

    #[test]
    fn test_new_rejects_out_of_range_did() {
        let params = RingParams::new(1024, 10).unwrap();
        assert!(matches!(
            PeerRing::new(node(1024), params),
            Err(Error::InvalidDid { .. })
        ));
    }

    #[test]
    fn test_create() -> Result<()> {
        let a = ring(10);
        assert_eq!(a.status()?, NodeStatus::Uninitialized);
        assert!(matches!(a.find_successor(3.into()), Err(Error::NotActive)));

        a.create()?;
        assert_eq!(a.status()?, NodeStatus::Active);
        assert_eq!(a.successor()?, Some(node(10)));
        assert_eq!(a.predecessor()?, None);
        assert!(matches!(a.create(), Err(Error::AlreadyActive)));

        // alone, every did belongs to self
        for did in [0u64, 9, 10, 11, 500, 1023] {
            assert_eq!(a.find_successor(did.into())?, PeerRingAction::Some(node(10)));
        }
        Ok(())
    }

    #[test]
    fn test_join() -> Result<()> {
        let b = ring(500);
        assert!(matches!(b.join(node(500)), Err(Error::JoinSelf)));
        assert_eq!(
            b.join(node(10))?,
            PeerRingAction::RemoteAction(node(10), RemoteAction::FindSuccessor(500.into()))
        );
        // still not active until the introducer answered
        assert!(!b.is_active()?);
        b.complete_join(node(10))?;
        assert!(b.is_active()?);
        assert_eq!(b.successor()?, Some(node(10)));
        assert_eq!(b.predecessor()?, None);
        assert!(matches!(b.join(node(10)), Err(Error::AlreadyActive)));
        assert!(matches!(b.complete_join(node(10)), Err(Error::AlreadyActive)));
        Ok(())
    }

    #[test]
    fn test_find_successor_routing() -> Result<()> {
        let a = ring(10);
        a.join(node(800))?;
        a.complete_join(node(500))?;

        // (10, 500] belongs to the successor
        assert_eq!(a.find_successor(300.into())?, PeerRingAction::Some(node(500)));
        assert_eq!(a.find_successor(500.into())?, PeerRingAction::Some(node(500)));
        // own did is owned by self
        assert_eq!(a.find_successor(10.into())?, PeerRingAction::Some(node(10)));

        // no finger yet, forward to the successor
        assert_eq!(
            a.find_successor(600.into())?,
            PeerRingAction::RemoteAction(node(500), RemoteAction::FindSuccessor(600.into()))
        );

        // with fingers, forward to the closest preceding one
        a.set_finger(9, Some(node(800)))?;
        assert_eq!(
            a.find_successor(900.into())?,
            PeerRingAction::RemoteAction(node(800), RemoteAction::FindSuccessor(900.into()))
        );
        assert_eq!(a.closest_preceding_node(900.into())?, node(800));
        assert_eq!(a.closest_preceding_node(200.into())?, node(10));

        assert!(matches!(
            a.find_successor(4096.into()),
            Err(Error::InvalidDid { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_find_successor_without_successor() -> Result<()> {
        let a = ring(10);
        a.create()?;
        a.invalidate_successor(10.into())?;
        // a node never invalidates itself as successor
        assert_eq!(a.successor()?, Some(node(10)));

        let b = ring(500);
        b.join(node(10))?;
        b.complete_join(node(10))?;
        assert!(b.invalidate_successor(10.into())?);
        assert_eq!(b.successor()?, None);
        assert_eq!(b.find_successor(600.into())?, PeerRingAction::Some(node(500)));
        Ok(())
    }

    #[test]
    fn test_notify() -> Result<()> {
        let a = ring(10);
        a.create()?;
        assert_eq!(a.notify(node(500))?, Some(node(500)));
        // 800 lies between 500 and 10
        assert_eq!(a.notify(node(800))?, Some(node(800)));
        // 500 does not lie between 800 and 10
        assert_eq!(a.notify(node(500))?, Some(node(800)));
        // repeated notify with the adopted candidate changes nothing
        assert_eq!(a.notify(node(800))?, Some(node(800)));
        // self is never adopted
        assert_eq!(a.notify(node(10))?, Some(node(800)));
        Ok(())
    }

    #[test]
    fn test_out_of_range_nodes_are_refused() -> Result<()> {
        let a = ring(10);
        assert!(matches!(a.join(node(5000)), Err(Error::InvalidDid { .. })));
        assert!(matches!(
            a.complete_join(node(5000)),
            Err(Error::InvalidDid { .. })
        ));
        assert!(!a.is_active()?);

        a.create()?;
        assert!(matches!(a.notify(node(5000)), Err(Error::InvalidDid { .. })));
        assert_eq!(a.predecessor()?, None);
        Ok(())
    }

    #[test]
    fn test_stabilize_decision() -> Result<()> {
        let a = ring(10);
        assert_eq!(a.stabilize(Some(node(500)))?, PeerRingAction::None);
        a.create()?;

        // alone and nobody reported: nothing to notify
        assert_eq!(a.stabilize(None)?, PeerRingAction::None);

        // successor is self, any other node is an improvement
        assert_eq!(
            a.stabilize(Some(node(500)))?,
            PeerRingAction::RemoteAction(node(500), RemoteAction::Notify(node(10)))
        );
        assert_eq!(a.successor()?, Some(node(500)));

        // 800 is not between 10 and 500
        assert_eq!(
            a.stabilize(Some(node(800)))?,
            PeerRingAction::RemoteAction(node(500), RemoteAction::Notify(node(10)))
        );
        assert_eq!(a.successor()?, Some(node(500)));

        // converged: successor reports self back
        assert_eq!(
            a.stabilize(Some(node(10)))?,
            PeerRingAction::RemoteAction(node(500), RemoteAction::Notify(node(10)))
        );
        assert_eq!(a.successor()?, Some(node(500)));

        // 300 lies between 10 and 500
        a.stabilize(Some(node(300)))?;
        assert_eq!(a.successor()?, Some(node(300)));
        Ok(())
    }

    #[test]
    fn test_invalidate_is_compare_and_clear() -> Result<()> {
        let a = ring(10);
        a.create()?;
        a.stabilize(Some(node(500)))?;
        a.notify(node(800))?;
        a.set_finger(0, Some(node(500)))?;

        assert!(!a.invalidate_successor(800.into())?);
        assert_eq!(a.successor()?, Some(node(500)));
        assert!(!a.invalidate_predecessor(500.into())?);
        assert_eq!(a.predecessor()?, Some(node(800)));

        assert!(a.invalidate_predecessor(800.into())?);
        assert_eq!(a.predecessor()?, None);
        assert!(a.invalidate_successor(500.into())?);
        assert_eq!(a.successor()?, None);
        assert!(a.snapshot()?.finger.is_empty());
        Ok(())
    }

    #[test]
    fn test_repair_successor() -> Result<()> {
        let a = ring(10);
        assert_eq!(a.repair_successor()?, None);
        a.create()?;
        // nothing to repair
        assert_eq!(a.repair_successor()?, None);

        a.stabilize(Some(node(500)))?;
        a.set_finger(8, Some(node(300)))?;
        a.set_finger(9, Some(node(800)))?;
        a.notify(node(900))?;
        a.invalidate_successor(500.into())?;
        assert_eq!(a.repair_successor()?, Some(node(300)));
        assert_eq!(a.successor()?, Some(node(300)));

        // without fingers the predecessor is used
        a.invalidate_successor(300.into())?;
        a.remove_finger(800.into())?;
        assert_eq!(a.repair_successor()?, Some(node(900)));

        // without anything, the node is alone
        a.invalidate_successor(900.into())?;
        a.invalidate_predecessor(900.into())?;
        assert_eq!(a.repair_successor()?, Some(node(10)));
        Ok(())
    }
}
