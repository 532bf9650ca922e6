#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

pub mod chord;
pub mod did;
/// Finger table for the ring
pub mod finger;
pub mod peer;
mod stabilization;
pub mod types;

pub use chord::NodeStatus;
pub use chord::PeerRing;
pub use chord::PeerRingAction;
pub use chord::RemoteAction as PeerRingRemoteAction;
pub use did::Did;
pub use did::RingParams;
pub use finger::FingerTable;
pub use peer::Node;
pub use peer::NodeLink;
pub use stabilization::StabilizeIntervals;
pub use stabilization::Stabilizer;
pub use types::Chord;
