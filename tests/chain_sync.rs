//! Cross-node chain reconciliation, end to end.
//!
//! One node serves its chain over a real socket; a lagging node registers
//! it as a peer and adopts the longer chain through `/nodes/resolve`.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use tallychain::api::build_router;
use tallychain::config::{Config, MiningConfig, NetworkConfig};
use tallychain::node::Node;

fn test_node() -> Arc<Node> {
    Arc::new(Node::new(Config {
        network: NetworkConfig::default(),
        mining: MiningConfig {
            difficulty: 2,
            reward: 20,
        },
    }))
}

/// Give `follower` the same genesis block as `leader`. Two independently
/// constructed ledgers carry different genesis timestamps and could never
/// reconcile otherwise.
async fn share_genesis(leader: &Node, follower: &Node) {
    let genesis = leader.ledger.read().await.chain()[..1].to_vec();
    follower.ledger.write().await.replace_chain(genesis);
}

#[tokio::test]
async fn lagging_node_adopts_longer_chain_over_http() {
    let leader = test_node();
    let follower = test_node();
    share_genesis(&leader, &follower).await;

    leader.mine_next_block().await.unwrap();
    leader.mine_next_block().await.unwrap();
    follower.mine_next_block().await.unwrap();

    // Serve the leader on a real port so the follower's HTTP fetcher can
    // reach it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let leader_app = build_router(leader.clone());
    tokio::spawn(async move {
        axum::serve(listener, leader_app).await.unwrap();
    });

    let follower_server =
        TestServer::new(build_router(follower.clone())).expect("Failed to create test server");

    let response = follower_server
        .post("/nodes/register")
        .json(&json!({"nodes": [format!("http://{addr}")]}))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = follower_server.get("/nodes/resolve").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["replaced"], true);
    assert_eq!(body["chain"].as_array().unwrap().len(), 3);

    let follower_ledger = follower.ledger.read().await;
    let leader_ledger = leader.ledger.read().await;
    assert_eq!(follower_ledger.chain(), leader_ledger.chain());
}

#[tokio::test]
async fn node_with_longest_chain_keeps_it() {
    let leader = test_node();
    let follower = test_node();
    share_genesis(&leader, &follower).await;

    // This time the resolving node is already ahead.
    leader.mine_next_block().await.unwrap();
    leader.mine_next_block().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let follower_app = build_router(follower.clone());
    tokio::spawn(async move {
        axum::serve(listener, follower_app).await.unwrap();
    });

    let leader_server =
        TestServer::new(build_router(leader.clone())).expect("Failed to create test server");

    leader_server
        .post("/nodes/register")
        .json(&json!({"nodes": [format!("http://{addr}")]}))
        .await;

    let response = leader_server.get("/nodes/resolve").await;
    let body: Value = response.json();
    assert_eq!(body["replaced"], false);
    assert_eq!(leader.ledger.read().await.len(), 3);
}

#[tokio::test]
async fn unreachable_peer_is_skipped_silently() {
    let node = test_node();
    let server = TestServer::new(build_router(node.clone())).expect("Failed to create test server");

    // Nothing listens on this port; resolution must not surface an error.
    server
        .post("/nodes/register")
        .json(&json!({"nodes": ["http://127.0.0.1:1"]}))
        .await;

    let response = server.get("/nodes/resolve").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["replaced"], false);
}
