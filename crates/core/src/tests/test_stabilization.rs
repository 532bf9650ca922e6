use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::dht::Chord;
use crate::dht::StabilizeIntervals;
use crate::error::Result;
use crate::tests::assert_ring_order;
use crate::tests::expected_owner;
use crate::tests::node;
use crate::tests::prepare_node;
use crate::tests::prepare_ring;
use crate::tests::run_rounds;
use crate::transport::MemoryHub;

#[tokio::test]
async fn test_three_nodes_converge() -> Result<()> {
    let hub = MemoryHub::new();
    let a = prepare_node(&hub, 10);
    let b = prepare_node(&hub, 500);
    let c = prepare_node(&hub, 800);

    a.swarm.create()?;
    b.swarm.join(a.node()).await?;
    assert_eq!(b.swarm.dht().successor()?, Some(node(10)));

    b.stabilizer.stabilize().await?;
    assert_eq!(a.swarm.dht().predecessor()?, Some(node(500)));

    c.swarm.join(a.node()).await?;
    let nodes = vec![a, b, c];
    run_rounds(&nodes, 5).await?;
    assert_ring_order(&nodes)?;

    // A(10) -> B(500) -> C(800) -> A
    assert_eq!(nodes[0].swarm.dht().successor()?, Some(node(500)));
    assert_eq!(nodes[1].swarm.dht().successor()?, Some(node(800)));
    assert_eq!(nodes[2].swarm.dht().successor()?, Some(node(10)));
    for n in &nodes {
        assert_eq!(n.swarm.find_successor(600.into()).await?, node(800));
    }
    Ok(())
}

#[tokio::test]
async fn test_sequential_joins_converge() -> Result<()> {
    let hub = MemoryHub::new();
    let ids = [517, 3, 1000, 250, 251, 768, 42, 900];
    let nodes = prepare_ring(&hub, &ids).await?;
    run_rounds(&nodes, 10).await?;
    assert_ring_order(&nodes)?;

    // every finger points at the true owner of its interval start
    for n in &nodes {
        let dht = n.swarm.dht();
        let state = dht.snapshot()?;
        for i in 0..dht.params.finger_table_size as usize {
            let start = dht.finger_start(i).value();
            assert_eq!(
                state.finger[i].as_ref().map(|f| f.did.value()),
                Some(expected_owner(&ids, start)),
                "finger {} of {}",
                i,
                n.did()
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_converged_ring_is_stable() -> Result<()> {
    let hub = MemoryHub::new();
    let nodes = prepare_ring(&hub, &[10, 500, 800]).await?;
    run_rounds(&nodes, 5).await?;

    let before: Vec<_> = nodes
        .iter()
        .map(|n| n.swarm.dht().snapshot().map(|s| (s.successor, s.predecessor)))
        .collect::<Result<_>>()?;

    run_rounds(&nodes, 3).await?;
    // repeated notify with the adopted predecessor is ignored
    nodes[1].swarm.dht().notify(node(10))?;

    let after: Vec<_> = nodes
        .iter()
        .map(|n| n.swarm.dht().snapshot().map(|s| (s.successor, s.predecessor)))
        .collect::<Result<_>>()?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn test_failed_node_is_routed_around() -> Result<()> {
    let hub = MemoryHub::new();
    let ids = [10, 200, 500, 650, 800];
    let mut nodes = prepare_ring(&hub, &ids).await?;
    run_rounds(&nodes, 8).await?;
    assert_ring_order(&nodes)?;

    // crash 500
    let dead = nodes.remove(2);
    hub.set_offline(&dead.node());

    // the successor of the crashed node forgets it as predecessor
    nodes[2].stabilizer.check_predecessor().await?;
    assert_eq!(nodes[2].swarm.dht().predecessor()?, None);
    // the predecessor of the crashed node loses its successor
    nodes[1].stabilizer.stabilize().await?;
    assert_eq!(nodes[1].swarm.dht().successor()?, None);

    run_rounds(&nodes, 10).await?;
    assert_ring_order(&nodes)?;

    let alive = [10, 200, 650, 800];
    for n in &nodes {
        for key in [0u64, 10, 11, 450, 500, 501, 650, 700, 1023] {
            assert_eq!(
                n.swarm.find_successor(key.into()).await?.did.value(),
                expected_owner(&alive, key),
                "lookup {} at {}",
                key,
                n.did()
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_stabilizer_timers() -> Result<()> {
    let hub = MemoryHub::new();
    let ids = [10, 500, 800];
    let a = prepare_node(&hub, ids[0]);
    let b = prepare_node(&hub, ids[1]);
    let c = prepare_node(&hub, ids[2]);

    a.swarm.create()?;
    b.swarm.join(a.node()).await?;
    c.swarm.join(a.node()).await?;

    let intervals = StabilizeIntervals {
        stabilize: Duration::from_millis(10),
        fix_fingers: Duration::from_millis(15),
        check_predecessor: Duration::from_millis(20),
    };
    let handles: Vec<_> = [&a, &b, &c]
        .iter()
        .map(|n| tokio::spawn(Arc::clone(&n.stabilizer).wait(intervals)))
        .collect();

    sleep(Duration::from_millis(1500)).await;
    for h in handles {
        h.abort();
    }

    let nodes = vec![a, b, c];
    assert_ring_order(&nodes)?;
    for n in &nodes {
        assert_eq!(n.swarm.find_successor(600.into()).await?, node(800));
    }
    Ok(())
}
