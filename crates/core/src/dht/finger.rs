#![warn(missing_docs)]
use std::ops::Index;

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::Node;
use crate::dht::NodeLink;
use crate::dht::RingParams;

/// Finger table of Chord DHT.
/// `finger[i]` approximates the owner of `(did + 2^i) mod MOD`. Entries are stale
/// approximations until the periodic refresh converges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerTable {
    did: Did,
    finger: Vec<NodeLink>,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did, size: usize) -> Self {
        Self {
            did,
            finger: vec![None; size],
        }
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get first known entry which is not the owner itself.
    pub fn first(&self) -> Option<&Node> {
        self.finger.iter().flatten().find(|n| n.did != self.did)
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.finger.get(index).and_then(|x| x.as_ref())
    }

    /// setter
    pub fn set(&mut self, index: usize, node: NodeLink) {
        if index >= self.finger.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        if self.finger[index] != node {
            tracing::debug!(
                "set finger table index: {} node: {:?}",
                index,
                node.as_ref().map(|n| n.did)
            );
        }
        self.finger[index] = node;
    }

    /// Remove a node from finger table.
    /// Slots it occupied are filled with the entry right after its last slot, or
    /// `None` if there is no such entry.
    pub fn remove(&mut self, did: Did) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.as_ref().map(|n| n.did) == Some(did))
            .map(|(i, _)| i)
            .collect();

        let (Some(first_idx), Some(last_idx)) = (indexes.first(), indexes.last()) else {
            return;
        };
        let end_idx = last_idx + 1;
        let fix = self.finger.get(end_idx).cloned().flatten();

        for idx in *first_idx..end_idx {
            if self.finger[idx].as_ref().map(|n| n.did) == Some(did) {
                self.finger[idx] = fix.clone();
            }
        }
    }

    /// Check finger contains some node
    pub fn contains(&self, did: Did) -> bool {
        self.finger.iter().flatten().any(|n| n.did == did)
    }

    /// Scan from the farthest finger down to the nearest one and return the first entry
    /// strictly between the owner and `target`. `None` if no finger qualifies.
    pub fn closest_preceding_node(&self, params: &RingParams, target: Did) -> Option<&Node> {
        self.finger
            .iter()
            .rev()
            .flatten()
            .find(|f| params.is_between_clockwise(self.did, f.did, target, false))
    }

    /// get count of known entries
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// get finger list
    pub fn list(&self) -> &Vec<NodeLink> {
        &self.finger
    }

    #[cfg(test)]
    pub fn reset_finger(&mut self) {
        self.finger = vec![None; self.finger.len()]
    }
}

impl Index<usize> for FingerTable {
    type Output = NodeLink;
    fn index(&self, index: usize) -> &Self::Output {
        &self.finger[index]
    }
}
