use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chord_core::dht::Did;
use chord_core::dht::Node;
use chord_core::dht::RingParams;
use chord_core::error::Error as CoreError;
use chord_core::message::Payload;
use chord_core::message::Request;
use chord_core::message::Response;
use chord_core::swarm::SwarmBuilder;
use tokio::net::TcpListener;
use tokio::time::sleep;

use crate::client::Client;
use crate::client::TcpTransport;
use crate::config::Config;
use crate::error::Error;
use crate::processor::Processor;
use crate::server::accept_loop;

const TIMEOUT: Duration = Duration::from_millis(500);

async fn spawn_node(did: u64) -> String {
    let mut config = Config::new("127.0.0.1:0", did);
    config.stabilize_interval_ms = 20;
    config.fix_fingers_interval_ms = 30;
    config.check_predecessor_interval_ms = 40;
    config.rpc_timeout_ms = TIMEOUT.as_millis() as u64;
    let processor = Processor::bind(&config).await.unwrap();
    let addr = processor.local_addr().to_string();
    tokio::spawn(processor.run());
    addr
}

fn client(addr: &str) -> Client {
    Client::new(addr, RingParams::default(), TIMEOUT)
}

#[tokio::test]
async fn test_tcp_ring_converges() {
    let a = spawn_node(10).await;
    let b = spawn_node(500).await;
    let c = spawn_node(800).await;

    let info = client(&a).get_info().await.unwrap();
    assert_eq!(info.did, Did::from(10));
    assert_eq!(info.address(), a);

    client(&a).create().await.unwrap();
    client(&b).join(&a).await.unwrap();
    client(&c).join(&a).await.unwrap();

    let expected = [(&a, &b), (&b, &c), (&c, &a)];
    let mut converged = false;
    for _ in 0..100 {
        sleep(Duration::from_millis(50)).await;
        let mut ok = true;
        for (node, succ) in expected {
            let info = client(node).inspect().await.unwrap();
            let succ = client(succ).get_info().await.unwrap();
            ok &= info.successor == Some(succ.to_string());
        }
        let pred = client(&b).get_predecessor().await.unwrap();
        ok &= pred.map(|n| n.did) == Some(Did::from(10));
        if ok {
            converged = true;
            break;
        }
    }
    assert!(converged, "ring did not converge");

    for addr in [&a, &b, &c] {
        let owner = client(addr).find_successor(600.into()).await.unwrap();
        assert_eq!(owner.did, Did::from(800));
    }
    assert_eq!(
        client(&b).get_predecessor().await.unwrap().map(|n| n.did),
        Some(Did::from(10))
    );
}

#[tokio::test]
async fn test_tcp_client_errors() {
    let a = spawn_node(10).await;

    // not part of a ring yet
    let err = client(&a).find_successor(3.into()).await.unwrap_err();
    assert!(matches!(err, Error::CoreError(CoreError::RemoteError(_))), "{err:?}");

    // other ring constants are refused
    let other = Client::new(&a, RingParams::new(2048, 11).unwrap(), TIMEOUT);
    let err = other.get_info().await.unwrap_err();
    assert!(matches!(err, Error::CoreError(CoreError::RemoteError(_))), "{err:?}");

    client(&a).create().await.unwrap();
    let err = client(&a).create().await.unwrap_err();
    assert!(matches!(err, Error::CoreError(CoreError::RemoteError(_))), "{err:?}");
}

#[tokio::test]
async fn test_tcp_transport_failures() {
    let transport = TcpTransport::new(Duration::from_millis(200));
    let payload = Payload::new(RingParams::default(), Request::GetInfo);

    // a listener that never answers
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap().to_string();
    let err = transport
        .request(&silent_addr, payload.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::RpcTimeout(_)), "{err:?}");
    assert!(err.is_transport_failure());

    // nobody listens anymore
    drop(silent);
    let err = transport.request(&silent_addr, payload).await.unwrap_err();
    assert!(err.is_transport_failure(), "{err:?}");
}

#[tokio::test]
async fn test_tcp_transport_call() {
    use chord_core::transport::Transport;

    let a = spawn_node(10).await;
    let (host, port) = crate::util::split_address(&a).unwrap();
    let target = Node::new(10u64, host, port);
    let transport = TcpTransport::new(TIMEOUT);
    let resp = transport
        .call(&target, Payload::new(RingParams::default(), Request::GetInfo))
        .await
        .unwrap();
    assert_eq!(resp, Response::Info(target));
}

#[tokio::test]
async fn test_server_survives_accept_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (host, port) = crate::util::split_address(&addr).unwrap();
    let swarm = Arc::new(
        SwarmBuilder::new(Node::new(10u64, host, port), Arc::new(TcpTransport::new(TIMEOUT)))
            .build()
            .unwrap(),
    );

    // the first accepts fail as if the process ran out of file descriptors
    let failures = AtomicUsize::new(3);
    let (listener, failures) = (&listener, &failures);
    let accept = move || async move {
        if failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(io::Error::new(io::ErrorKind::Other, "too many open files"));
        }
        listener.accept().await
    };

    let client = Client::new(&addr, RingParams::default(), Duration::from_secs(2));
    tokio::select! {
        res = accept_loop(accept, swarm) => panic!("server stopped: {res:?}"),
        info = client.get_info() => {
            assert_eq!(info.unwrap().did, Did::from(10));
        }
    }
    assert_eq!(failures.load(Ordering::SeqCst), 0);
}
