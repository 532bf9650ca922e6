#![warn(missing_docs)]

//! Processor of the chord node daemon: wires the server, the swarm and the stabilizer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chord_core::dht::StabilizeIntervals;
use chord_core::dht::Stabilizer;
use chord_core::swarm::Swarm;
use chord_core::swarm::SwarmBuilder;

use crate::client::Client;
use crate::client::TcpTransport;
use crate::config::Bootstrap;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::server::Server;

/// A node with its listener bound, ready to run.
pub struct Processor {
    swarm: Arc<Swarm>,
    stabilizer: Arc<Stabilizer>,
    server: Server,
    local_addr: SocketAddr,
    intervals: StabilizeIntervals,
    rpc_timeout: Duration,
    bootstrap: Option<Bootstrap>,
}

impl Processor {
    /// Validate `config`, bind the listener and build the swarm. The advertised port
    /// is the bound one, so `bind_addr` may use port `0`.
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;
        let server = Server::bind(&config.bind_addr).await?;
        let local_addr = server.local_addr()?;
        let node = config.node(local_addr.port())?;

        let transport = Arc::new(TcpTransport::new(config.rpc_timeout()));
        let swarm = Arc::new(
            SwarmBuilder::new(node, transport)
                .params(config.params()?)
                .max_lookup_hops(config.max_lookup_hops)
                .build()?,
        );
        let stabilizer = Arc::new(Stabilizer::new(swarm.clone()));

        Ok(Self {
            swarm,
            stabilizer,
            server,
            local_addr,
            intervals: config.intervals(),
            rpc_timeout: config.rpc_timeout(),
            bootstrap: config.bootstrap.clone(),
        })
    }

    /// The swarm of this node.
    pub fn swarm(&self) -> Arc<Swarm> {
        self.swarm.clone()
    }

    /// Address the server listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests, enter the ring if configured, and run the maintenance tasks
    /// until the server fails.
    pub async fn run(self) -> Result<()> {
        let serving = tokio::spawn(self.server.serve(self.swarm.clone()));

        if let Some(bootstrap) = &self.bootstrap {
            if let Err(e) = bootstrap_swarm(&self.swarm, bootstrap, self.rpc_timeout).await {
                serving.abort();
                return Err(e);
            }
        }

        let maintenance = tokio::spawn(self.stabilizer.wait(self.intervals));
        let result = serving.await;
        maintenance.abort();
        result.map_err(|e| Error::ServerError(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}

/// Enter a ring: create one, or join through the node listening at the given address.
pub async fn bootstrap_swarm(swarm: &Swarm, bootstrap: &Bootstrap, timeout: Duration) -> Result<()> {
    match bootstrap {
        Bootstrap::Create => swarm.create()?,
        Bootstrap::Join(address) => {
            let introducer = Client::new(address, swarm.params(), timeout)
                .get_info()
                .await?;
            swarm.join(introducer).await?
        }
    }
    tracing::info!("node {} entered the ring with {:?}", swarm.node(), bootstrap);
    Ok(())
}
