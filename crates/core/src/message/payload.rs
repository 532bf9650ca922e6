use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use super::Request;
use super::Response;
use crate::dht::RingParams;
use crate::error::Error;
use crate::error::Result;

/// Envelope of every request. Carries the ring constants of the sender so a
/// receiver can refuse peers of another ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Ring constants of the sender.
    pub params: RingParams,
    /// The request itself.
    pub request: Request,
}

impl Payload {
    /// Wrap a request.
    pub fn new(params: RingParams, request: Request) -> Self {
        Self { params, request }
    }

    /// Decode a payload from bincode bytes.
    pub fn from_bincode(data: &[u8]) -> Result<Self> {
        decode(data)
    }

    /// Encode the payload with bincode.
    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}

impl Response {
    /// Decode a response from bincode bytes.
    pub fn from_bincode(data: &[u8]) -> Result<Self> {
        decode(data)
    }

    /// Encode the response with bincode.
    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}

/// Serialize data with bincode.
pub fn encode<T>(data: &T) -> Result<Vec<u8>>
where T: Serialize {
    bincode::serialize(data).map_err(Error::BincodeSerialize)
}

/// Deserialize data with bincode.
pub fn decode<T>(data: &[u8]) -> Result<T>
where T: DeserializeOwned {
    bincode::deserialize(data).map_err(Error::BincodeDeserialize)
}
