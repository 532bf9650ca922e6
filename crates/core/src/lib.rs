//! Chord: membership and routing core of a Chord ring.
//! --------------
//! - [Chord](crate::dht::PeerRing) keeps, for every node, its successor, its predecessor
//!   and a finger table of routing shortcuts over a ring of size `MOD`.
//! - [Swarm](crate::swarm::Swarm) executes the remote calls the ring state asks for and
//!   answers the requests of other nodes.
//! - [Transport](crate::transport::Transport) is the call-with-timeout primitive between nodes.
//!
//! # Join a ring
//!
//! 1. Node A calls `create`, it is alone and its own successor.
//! 2. Node B calls `join(A)`: B asks A for the successor of B's did and takes the answer
//!    as successor. Predecessor and fingers are left unknown.
//! 3. The periodic [Stabilizer](crate::dht::Stabilizer) converges every pointer:
//!    - `stabilize` asks the successor for its predecessor, adopts it if it lies between,
//!      then notifies the successor about self.
//!    - `fix_fingers` resolves `(did + 2^i) mod MOD` for every finger entry.
//!    - `check_predecessor` forgets a predecessor that stopped answering.
//!
//! The repair model is eventually consistent. A failed remote call is never fatal, each
//! caller has a fallback and the next periodic run retries.

pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod message;
pub mod swarm;
#[cfg(test)]
mod tests;
pub mod transport;
