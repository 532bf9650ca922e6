//! Error of chord_core

use crate::dht::Did;
use crate::dht::RingParams;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chord-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Remote call to {0} timed out")]
    RpcTimeout(String),

    #[error("Peer {0} is unreachable")]
    PeerUnreachable(String),

    #[error("Remote peer returned error: {0}")]
    RemoteError(String),

    #[error("Unexpected response from remote peer: {0}")]
    UnexpectedResponse(String),

    #[error("Lookup exceeded the maximum of {0} hops")]
    LookupHopsExceeded(u32),

    #[error("Did {did} is out of ring range [0, {modulus})")]
    InvalidDid { did: Did, modulus: u64 },

    #[error("Invalid ring params: {0}")]
    InvalidRingParams(String),

    #[error("Ring params mismatch, local {local}, remote {remote}")]
    RingParamsMismatch { local: RingParams, remote: RingParams },

    #[error("Node is not active, call create or join first")]
    NotActive,

    #[error("Node is already active")]
    AlreadyActive,

    #[error("You should not join through yourself")]
    JoinSelf,

    #[error("Invalid PeerRing action: {0}")]
    InvalidAction(String),

    #[error("Bincode serialization error")]
    BincodeSerialize(#[source] bincode::Error),

    #[error("Bincode deserialization error")]
    BincodeDeserialize(#[source] bincode::Error),

    #[error("DHT lock failed")]
    DHTSyncLockError,
}

impl Error {
    /// Returns `true` when the peer was absent: unreachable or not answering in time.
    /// Callers absorb these with an operation-specific fallback.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::RpcTimeout(_) | Error::PeerUnreachable(_))
    }
}
