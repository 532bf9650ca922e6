//! DHT types about `PeerRing`.
#![warn(missing_docs)]

use super::did::Did;
use super::peer::Node;
use super::peer::NodeLink;
use crate::error::Result;

/// Chord is a distributed hash table (DHT) algorithm that is designed to efficiently
/// locate the node responsible for a key in a peer-to-peer network. You may want to
/// browse its [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) or the
/// [paper](https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf) before you read this.
///
/// Methods of this trait only touch local state. Whenever the algorithm needs a peer
/// to do something, the method returns an `Action` describing the remote call instead
/// of performing it. The outer driver executes the call and feeds the result back.
/// This keeps the state lock away from network round trips.
pub trait Chord<Action> {
    /// Start a new ring with this node as the only member.
    fn create(&self) -> Result<()>;

    /// Join a ring through `introducer`.
    /// Returns the remote lookup the introducer must answer to give us a successor.
    fn join(&self, introducer: Node) -> Result<Action>;

    /// Ask DHT for the successor of did.
    /// May return a remote action when the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<Action>;

    /// The farthest known finger strictly between self and `did`, or self.
    fn closest_preceding_node(&self, did: Did) -> Result<Node>;

    /// Notify the DHT that a node might be its predecessor.
    /// This method returns the predecessor after updating.
    fn notify(&self, candidate: Node) -> Result<NodeLink>;

    /// Decide the next step of stabilization from the predecessor `x` reported by
    /// the successor.
    fn stabilize(&self, x: NodeLink) -> Result<Action>;
}
