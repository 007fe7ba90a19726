//! Black-box tests for the client-side (consistent-hash ring) router.

mod common;

use common::MockConnection;
use shardkv_router::{BasicCommand, ClientClusterRouter, ClusterRouter, ConnectionParameters, Reply};

fn node(alias: &str, weight: u32) -> Box<dyn shardkv_router::Connection> {
    MockConnection::boxed(
        ConnectionParameters::new("127.0.0.1", 6379).with_alias(alias).with_weight(weight),
        vec![Reply::Value(alias.as_bytes().to_vec())],
    )
}

#[tokio::test]
async fn ring_routes_consistently_and_memoizes_on_command() {
    let router = ClientClusterRouter::new();
    router.add(node("a", 1));
    router.add(node("b", 1));
    router.add(node("c", 2));

    let cmd = BasicCommand::new("GET", vec![b"x".to_vec()]);
    assert!(cmd.hash().is_none());
    let first = router.get_connection(&cmd).await.unwrap();
    assert!(cmd.hash().is_some());
    let second = router.get_connection(&cmd).await.unwrap();

    assert_eq!(
        first.lock().await.parameters().id(),
        second.lock().await.parameters().id()
    );
}

#[tokio::test]
async fn removing_an_absent_node_does_not_disturb_routing() {
    let router = ClientClusterRouter::new();
    router.add(node("a", 1));
    router.add(node("b", 1));
    router.add(node("c", 2));

    let sample: Vec<Vec<u8>> = (0..200u32).map(|i| format!("key-{i}").into_bytes()).collect();
    let mut before = Vec::new();
    for key in &sample {
        let cmd = BasicCommand::new("GET", vec![key.clone()]);
        let conn = router.get_connection(&cmd).await.unwrap();
        before.push(conn.lock().await.parameters().id());
    }

    router.remove_by_id("d");

    for (key, expected) in sample.iter().zip(before.iter()) {
        let cmd = BasicCommand::new("GET", vec![key.clone()]);
        let conn = router.get_connection(&cmd).await.unwrap();
        assert_eq!(&conn.lock().await.parameters().id(), expected);
    }
}

#[tokio::test]
async fn adding_a_node_moves_only_a_bounded_fraction_of_keys() {
    let router = ClientClusterRouter::new();
    router.add(node("a", 1));
    router.add(node("b", 1));
    router.add(node("c", 1));

    let sample: Vec<Vec<u8>> = (0..2000u32).map(|i| format!("key-{i}").into_bytes()).collect();
    let mut before = Vec::new();
    for key in &sample {
        let cmd = BasicCommand::new("GET", vec![key.clone()]);
        let conn = router.get_connection(&cmd).await.unwrap();
        before.push(conn.lock().await.parameters().id());
    }

    router.add(node("d", 1));

    let mut moved = 0;
    for (key, prior) in sample.iter().zip(before.iter()) {
        let cmd = BasicCommand::new("GET", vec![key.clone()]);
        let conn = router.get_connection(&cmd).await.unwrap();
        let now = conn.lock().await.parameters().id();
        if &now != prior {
            moved += 1;
            assert_eq!(now, "d", "a key should only move onto the newly added node");
        }
    }
    assert!(moved < sample.len() / 2, "moved {moved} of {}", sample.len());
}

#[tokio::test]
async fn hash_tag_colocates_related_keys_on_the_ring() {
    let router = ClientClusterRouter::new();
    router.add(node("a", 1));
    router.add(node("b", 1));
    router.add(node("c", 1));

    let c1 = BasicCommand::new("GET", vec![b"{user1000}.following".to_vec()]);
    let c2 = BasicCommand::new("GET", vec![b"{user1000}.followers".to_vec()]);
    let n1 = router.get_connection(&c1).await.unwrap();
    let n2 = router.get_connection(&c2).await.unwrap();
    assert_eq!(
        n1.lock().await.parameters().id(),
        n2.lock().await.parameters().id()
    );
}

#[tokio::test]
async fn execute_command_on_nodes_hits_every_pooled_connection_in_order() {
    let router = ClientClusterRouter::new();
    router.add(node("a", 1));
    router.add(node("b", 1));
    router.add(node("c", 1));

    let cmd = BasicCommand::new("PING", vec![]);
    let replies = router.execute_command_on_nodes(&cmd).await.unwrap();
    let ids: Vec<Vec<u8>> = replies
        .into_iter()
        .map(|r| match r {
            Reply::Value(v) => v,
            Reply::Error(e) => e.into_bytes(),
        })
        .collect();
    assert_eq!(ids, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[tokio::test]
async fn no_redirection_protocol_in_this_regime() {
    // A server-error reply is surfaced as-is; the client router never
    // interprets it as a routing signal.
    let router = ClientClusterRouter::new();
    router.add(MockConnection::boxed(
        ConnectionParameters::new("127.0.0.1", 6379).with_alias("a"),
        vec![Reply::Error("MOVED 0 127.0.0.1:9999".to_string())],
    ));

    let cmd = BasicCommand::new("GET", vec![b"x".to_vec()]);
    let reply = router.execute_command(&cmd).await.unwrap();
    assert!(matches!(reply, Reply::Error(e) if e.starts_with("MOVED")));
    assert_eq!(router.count(), 1);
}
