use std::sync::Arc;

use crate::dht::Did;
use crate::dht::Node;
use crate::dht::RingParams;
use crate::dht::Stabilizer;
use crate::error::Result;
use crate::swarm::Swarm;
use crate::swarm::SwarmBuilder;
use crate::transport::MemoryHub;

mod test_stabilization;

#[allow(dead_code)]
pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// A swarm together with its maintenance tasks.
pub struct TestNode {
    pub swarm: Arc<Swarm>,
    pub stabilizer: Arc<Stabilizer>,
}

impl TestNode {
    pub fn node(&self) -> Node {
        self.swarm.node().clone()
    }

    pub fn did(&self) -> Did {
        self.swarm.did()
    }
}

pub fn node(id: u64) -> Node {
    Node::new(id, "127.0.0.1", 20000 + id as u16)
}

pub fn prepare_node(hub: &Arc<MemoryHub>, id: u64) -> TestNode {
    prepare_node_with(hub, id, |b| b)
}

pub fn prepare_node_with(
    hub: &Arc<MemoryHub>,
    id: u64,
    f: impl FnOnce(SwarmBuilder) -> SwarmBuilder,
) -> TestNode {
    let builder = SwarmBuilder::new(node(id), hub.transport()).params(RingParams::default());
    let swarm = Arc::new(f(builder).build().unwrap());
    hub.register(&swarm);
    let stabilizer = Arc::new(Stabilizer::new(swarm.clone()));
    TestNode { swarm, stabilizer }
}

/// Create a ring on the first id, then join the others one by one through it,
/// stabilizing once after each join.
pub async fn prepare_ring(hub: &Arc<MemoryHub>, ids: &[u64]) -> Result<Vec<TestNode>> {
    let mut nodes: Vec<TestNode> = vec![];
    for id in ids {
        let n = prepare_node(hub, *id);
        match nodes.first() {
            None => n.swarm.create()?,
            Some(introducer) => n.swarm.join(introducer.node()).await?,
        }
        nodes.push(n);
        run_rounds(&nodes, 1).await?;
    }
    Ok(nodes)
}

/// One deterministic maintenance round per node:
/// check_predecessor everywhere, then stabilize everywhere, then fix fingers everywhere.
pub async fn run_rounds(nodes: &[TestNode], rounds: usize) -> Result<()> {
    for _ in 0..rounds {
        for n in nodes {
            n.stabilizer.check_predecessor().await?;
        }
        for n in nodes {
            n.stabilizer.stabilize().await?;
        }
        for n in nodes {
            n.stabilizer.fix_fingers().await?;
        }
    }
    Ok(())
}

/// The true owner of `key` among `ids`: the first id clockwise from `key`, inclusive.
pub fn expected_owner(ids: &[u64], key: u64) -> u64 {
    let mut sorted = ids.to_vec();
    sorted.sort();
    sorted
        .iter()
        .find(|id| **id >= key)
        .copied()
        .unwrap_or(sorted[0])
}

/// Check successor and predecessor of every node follow the sorted ring order.
pub fn assert_ring_order(nodes: &[TestNode]) -> Result<()> {
    let mut ids: Vec<u64> = nodes.iter().map(|n| n.did().value()).collect();
    ids.sort();
    for n in nodes {
        let id = n.did().value();
        let pos = ids.iter().position(|x| *x == id).unwrap();
        let succ = ids[(pos + 1) % ids.len()];
        let pred = ids[(pos + ids.len() - 1) % ids.len()];
        assert_eq!(
            n.swarm.dht().successor()?.map(|x| x.did.value()),
            Some(succ),
            "successor of {}",
            id
        );
        assert_eq!(
            n.swarm.dht().predecessor()?.map(|x| x.did.value()),
            Some(pred),
            "predecessor of {}",
            id
        );
    }
    Ok(())
}
