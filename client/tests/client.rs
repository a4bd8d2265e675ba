//! Integration tests for the NodeClient against a fake node served on localhost.

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use near_peers_client::{ClientConfiguration, ClientError, NodeClient, SyncStatusView};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral localhost port and return the port.
async fn fake_node(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

fn client(port: u16) -> NodeClient {
    NodeClient::new(ClientConfiguration::default().with_port(port)).unwrap()
}

async fn status(headers: HeaderMap) -> Json<Value> {
    // Echo the user agent back through the chain id so the test can see it.
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "chain_id": user_agent,
        "protocol_version": 63,
        "latest_protocol_version": 63,
        "sync_info": { "latest_block_height": 100, "syncing": false },
        "validator_account_id": null,
    }))
}

async fn debug_status() -> Json<Value> {
    Json(json!({
        "chain_id": "localnet",
        "sync_info": { "latest_block_height": 101 },
        "validator_account_id": "node0",
        "detailed_debug_status": {
            "network_info": {
                "connected_peers": [{ "addr": "1.2.3.5:24567" }],
                "tier1_connections": []
            }
        }
    }))
}

async fn sync_status() -> Json<Value> {
    Json(json!({
        "status_response": { "SyncStatus": { "BodySync": {
            "start_height": 90, "current_height": 95, "highest_height": 101
        }}}
    }))
}

async fn tracked_shards() -> Json<Value> {
    Json(json!({
        "status_response": { "TrackedShards": {
            "shards_tracked_this_epoch": [true, true],
            "shards_tracked_next_epoch": [false, true]
        }}
    }))
}

fn healthy_node() -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/debug/api/status", get(debug_status))
        .route("/debug/api/sync_status", get(sync_status))
        .route("/debug/api/tracked_shards", get(tracked_shards))
}

#[tokio::test]
async fn test_fetch_all_endpoints() {
    let port = fake_node(healthy_node()).await;
    let client = NodeClient::new(
        ClientConfiguration::default()
            .with_port(port)
            .with_user_agent("near-peers-test/1")
            .unwrap(),
    )
    .unwrap();

    let basic = client.basic_status("127.0.0.1").await.unwrap();
    assert_eq!(basic.sync_info.latest_block_height, 100);
    assert_eq!(basic.validator_account_id, None);
    assert_eq!(basic.chain_id, "near-peers-test/1");
    assert!(basic.network_info().is_none());

    let detailed = client.detailed_status("127.0.0.1").await.unwrap();
    assert_eq!(detailed.validator_account_id.as_deref(), Some("node0"));
    assert_eq!(detailed.network_info().unwrap().peer_ips(), vec!["1.2.3.5"]);

    let sync = client.sync_status("127.0.0.1").await.unwrap();
    assert_eq!(
        sync.status(),
        &SyncStatusView::BodySync {
            start_height: 90,
            current_height: 95,
            highest_height: 101
        }
    );

    let shards = client.tracked_shards("127.0.0.1").await.unwrap();
    assert_eq!(shards.tracked_shards().shards_this_epoch(), vec![0, 1]);
    assert_eq!(shards.tracked_shards().shards_next_epoch(), vec![1]);
}

#[tokio::test]
async fn test_non_success_status() {
    let app = Router::new().route(
        "/status",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
    );
    let port = fake_node(app).await;

    match client(port).basic_status("127.0.0.1").await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "warming up");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_debug_api() {
    // Nodes started without the debug page enabled only serve /status.
    let app = Router::new().route("/status", get(status));
    let port = fake_node(app).await;
    let client = client(port);

    assert!(client.basic_status("127.0.0.1").await.is_ok());
    match client.sync_status("127.0.0.1").await {
        Err(ClientError::Status { status, .. }) => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let app = Router::new()
        .route("/status", get(|| async { "definitely not json" }))
        .route(
            "/debug/api/tracked_shards",
            get(|| async { Json(json!({ "status_response": { "SyncStatus": "NoSync" } })) }),
        );
    let port = fake_node(app).await;
    let client = client(port);

    assert!(matches!(
        client.basic_status("127.0.0.1").await,
        Err(ClientError::Decode(_))
    ));
    assert!(matches!(
        client.tracked_shards("127.0.0.1").await,
        Err(ClientError::Decode(_))
    ));
}

#[tokio::test]
async fn test_connection_refused() {
    // Grab a free port and release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    match client(port).basic_status("127.0.0.1").await {
        Err(err @ ClientError::Transport(_)) => assert!(!err.is_timeout()),
        other => panic!("Expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_timeout() {
    let app = Router::new().route(
        "/status",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let port = fake_node(app).await;
    let client = NodeClient::new(
        ClientConfiguration::default()
            .with_port(port)
            .with_request_timeout(Some(Duration::from_millis(100))),
    )
    .unwrap();

    let err = client.basic_status("127.0.0.1").await.unwrap_err();
    assert!(err.is_timeout(), "Expected timeout, got {err}");
}
