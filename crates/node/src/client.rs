#![warn(missing_docs)]
//! TCP transport between nodes, and the client used by the command line.
//!
//! Every call opens a connection, sends one length-delimited bincode [Payload] frame and
//! reads one [Response] frame back. Connect, send and receive share a single timeout.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chord_core::consts::MAX_FRAME_LENGTH;
use chord_core::dht::Did;
use chord_core::dht::Node;
use chord_core::dht::NodeLink;
use chord_core::dht::RingParams;
use chord_core::error::Error as CoreError;
use chord_core::error::Result as CoreResult;
use chord_core::inspect::DHTInspect;
use chord_core::message::Payload;
use chord_core::message::Request;
use chord_core::message::Response;
use chord_core::transport::Transport;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::Error;
use crate::error::Result;

/// Codec of the node protocol.
pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

/// [Transport] over TCP.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    /// Create a transport bounding every call with `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// One request/response exchange with the node listening at `address`.
    pub async fn request(&self, address: &str, payload: Payload) -> CoreResult<Response> {
        let data = payload.to_bincode()?;
        match tokio::time::timeout(self.timeout, exchange(address, data)).await {
            Ok(Ok(frame)) => Response::from_bincode(&frame),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CoreError::RpcTimeout(address.to_string())),
        }
    }
}

async fn exchange(address: &str, data: Vec<u8>) -> CoreResult<Vec<u8>> {
    let unreachable = |e: std::io::Error| {
        tracing::debug!("call {} failed: {}", address, e);
        CoreError::PeerUnreachable(address.to_string())
    };
    let stream = TcpStream::connect(address).await.map_err(unreachable)?;
    let mut framed = Framed::new(stream, codec());
    framed.send(Bytes::from(data)).await.map_err(unreachable)?;
    match framed.next().await {
        Some(Ok(frame)) => Ok(frame.to_vec()),
        Some(Err(e)) => Err(unreachable(e)),
        None => Err(CoreError::PeerUnreachable(address.to_string())),
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, target: &Node, payload: Payload) -> CoreResult<Response> {
        self.request(&target.address(), payload).await
    }
}

/// Client of a running node, addressed by `host:port`.
pub struct Client {
    endpoint: String,
    params: RingParams,
    transport: TcpTransport,
}

impl Client {
    /// Create a client. `params` must match the ring constants of the node.
    pub fn new(endpoint: &str, params: RingParams, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params,
            transport: TcpTransport::new(timeout),
        }
    }

    async fn call(&self, request: Request) -> Result<Response> {
        let resp = self
            .transport
            .request(&self.endpoint, Payload::new(self.params, request))
            .await?;
        match resp {
            Response::Error(e) => Err(CoreError::RemoteError(e).into()),
            Response::LookupFailed { hops } => Err(CoreError::LookupHopsExceeded(hops).into()),
            resp => Ok(resp),
        }
    }

    /// Identity of the node.
    pub async fn get_info(&self) -> Result<Node> {
        match self.call(Request::GetInfo).await? {
            Response::Info(node) => Ok(node),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }

    /// Ask the node to start a new ring.
    pub async fn create(&self) -> Result<()> {
        match self.call(Request::Create).await? {
            Response::Done => Ok(()),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }

    /// Ask the node to join the ring of the node listening at `introducer`.
    pub async fn join(&self, introducer: &str) -> Result<()> {
        let introducer = Client::new(introducer, self.params, self.transport.timeout)
            .get_info()
            .await?;
        match self.call(Request::Join(introducer)).await? {
            Response::Done => Ok(()),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }

    /// Resolve the owner of `did` through the node.
    pub async fn find_successor(&self, did: Did) -> Result<Node> {
        match self
            .call(Request::FindSuccessor { did, hops: 0 })
            .await?
        {
            Response::Successor(node) => Ok(node),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }

    /// Current predecessor of the node.
    pub async fn get_predecessor(&self) -> Result<NodeLink> {
        match self.call(Request::GetPredecessor).await? {
            Response::Predecessor(pred) => Ok(pred),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }

    /// Status snapshot of the node.
    pub async fn inspect(&self) -> Result<DHTInspect> {
        match self.call(Request::Inspect).await? {
            Response::Inspect(info) => Ok(info),
            resp => Err(Error::UnexpectedResponse(format!("{:?}", resp))),
        }
    }
}
