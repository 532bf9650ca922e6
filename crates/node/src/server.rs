//! TCP server answering the requests of other nodes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chord_core::message::Payload;
use chord_core::message::Response;
use chord_core::swarm::Swarm;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::client::codec;
use crate::error::Error;
use crate::error::Result;

/// A bound listener, not serving yet.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind the listen address. Port `0` picks an ephemeral port.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::BindError(addr.to_string(), e))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::ServerError)
    }

    /// Accept connections forever, each served on its own task.
    pub async fn serve(self, swarm: Arc<Swarm>) -> Result<()> {
        tracing::info!("node {} listening on {}", swarm.node(), self.local_addr()?);
        accept_loop(|| self.listener.accept(), swarm).await
    }
}

/// Pause after a failed accept, e.g. when the process ran out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Serve every accepted connection. A failed accept is logged and retried.
pub(crate) async fn accept_loop<A, Fut>(mut accept: A, swarm: Arc<Swarm>) -> Result<()>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<(TcpStream, SocketAddr)>>,
{
    loop {
        let (stream, peer) = match accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let swarm = swarm.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, swarm).await {
                tracing::debug!("connection from {} closed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, swarm: Arc<Swarm>) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, codec());
    while let Some(frame) = framed.next().await {
        let resp = match Payload::from_bincode(&frame?) {
            Ok(payload) => swarm.handle_payload(payload).await,
            Err(e) => {
                tracing::warn!("drop malformed payload: {}", e);
                Response::Error(e.to_string())
            }
        };
        let data = match resp.to_bincode() {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("failed to encode response: {}", e);
                return Ok(());
            }
        };
        framed.send(Bytes::from(data)).await?;
    }
    Ok(())
}
