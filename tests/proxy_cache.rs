//! Proxy integration tests: caching, invalidation, routing and failures.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use warehouse_proxy::lifecycle::Shutdown;
use warehouse_proxy::replication::{PrimaryFileSource, Replicator, DEFAULT_SYNC_INTERVAL};
use warehouse_proxy::store::{RecordStore, Role};

mod common;

#[tokio::test]
async fn test_identical_list_reads_hit_backend_once() {
    let shutdown = Shutdown::new();
    let backend = common::start_programmable_backend(|_| async { (200, "[]".to_string()) }).await;
    let (proxy, _) = common::start_proxy(vec![backend.endpoint()], vec![backend.endpoint()], &shutdown).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client
            .get(format!("http://{}/employees?offset=0&limit=10", proxy))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "[]");
    }
    assert_eq!(backend.hits(), 1);

    // A different query is a different key.
    client
        .get(format!("http://{}/employees?offset=10&limit=10", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(backend.hits(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_update_invalidates_single_record_read() {
    let shutdown = Shutdown::new();
    let backend = common::start_programmable_backend(|line| async move {
        if line.starts_with("GET") {
            (200, r#"{"id":1,"name":"Ada","position":"Engineer","salary":1.0}"#.to_string())
        } else {
            (200, r#"{"message":"ok"}"#.to_string())
        }
    })
    .await;
    let (proxy, cache) = common::start_proxy(vec![backend.endpoint()], vec![backend.endpoint()], &shutdown).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/employee/1", proxy);

    client.get(&url).send().await.unwrap();
    client.get(&url).send().await.unwrap();
    assert_eq!(backend.hits(), 1);
    assert!(cache.get("GET:/employee/1").await.unwrap().is_some());

    let res = client
        .post(format!("http://{}/employee", proxy))
        .json(&json!({"id": 1, "name": "Ada", "position": "Lead", "salary": 2.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(backend.hits(), 2);
    assert_eq!(cache.get("GET:/employee/1").await.unwrap(), None);

    client.get(&url).send().await.unwrap();
    assert_eq!(backend.hits(), 3);

    let res = client.delete(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(cache.get("GET:/employee/1").await.unwrap(), None);

    assert_eq!(
        backend.requests(),
        vec!["GET /employee/1", "POST /employee", "GET /employee/1", "DELETE /employee/1"]
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_error_responses_are_relayed_not_cached() {
    let shutdown = Shutdown::new();
    let backend = common::start_programmable_backend(|_| async {
        (404, r#"{"error":"Employee not found"}"#.to_string())
    })
    .await;
    let (proxy, cache) = common::start_proxy(vec![backend.endpoint()], vec![backend.endpoint()], &shutdown).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client.get(format!("http://{}/employee/9", proxy)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Employee not found");
    }
    assert_eq!(backend.hits(), 2);
    assert!(cache.is_empty().await.unwrap());

    shutdown.trigger();
}

#[tokio::test]
async fn test_reads_rotate_replicas_and_writes_go_to_primary() {
    let shutdown = Shutdown::new();
    let primary = common::start_mock_backend().await;
    let replica_a = common::start_mock_backend().await;
    let replica_b = common::start_mock_backend().await;
    let (proxy, _) = common::start_proxy(
        vec![primary.endpoint()],
        vec![replica_a.endpoint(), replica_b.endpoint()],
        &shutdown,
    )
    .await;
    let client = reqwest::Client::new();

    for id in 1..=4 {
        client.get(format!("http://{}/employee/{}", proxy, id)).send().await.unwrap();
    }
    assert_eq!(replica_a.hits(), 2);
    assert_eq!(replica_b.hits(), 2);
    assert_eq!(primary.hits(), 0);

    client
        .put(format!("http://{}/employee", proxy))
        .json(&json!({"name": "Ada", "position": "Engineer", "salary": 1.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(primary.hits(), 1);
    assert_eq!(replica_a.hits() + replica_b.hits(), 4);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let shutdown = Shutdown::new();
    let dead = common::dead_endpoint().await;
    let (proxy, _) = common::start_proxy(vec![dead.clone()], vec![dead], &shutdown).await;

    let res = reqwest::get(format!("http://{}/employees", proxy)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn test_unsupported_method_is_rejected() {
    let shutdown = Shutdown::new();
    let backend = common::start_mock_backend().await;
    let (proxy, _) = common::start_proxy(vec![backend.endpoint()], vec![], &shutdown).await;

    let res = reqwest::Client::new()
        .patch(format!("http://{}/employee/1", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(backend.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_reaches_backend_response() {
    let shutdown = Shutdown::new();
    let backend = common::start_mock_backend().await;
    let (proxy, _) = common::start_proxy(vec![backend.endpoint()], vec![], &shutdown).await;

    let res = reqwest::get(format!("http://{}/employees", proxy)).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_full_stack_write_replicate_read() {
    let dir = tempfile::tempdir().unwrap();
    let primary_path = dir.path().join("primary.db");
    let primary = Arc::new(RecordStore::open(&primary_path, Role::Primary).unwrap());
    let replica = Arc::new(RecordStore::open(dir.path().join("replica.db"), Role::Replica).unwrap());

    let shutdown = Shutdown::new();
    let primary_addr = common::start_node(primary, &shutdown).await;
    let replica_addr = common::start_node(replica.clone(), &shutdown).await;
    let (proxy, _) = common::start_proxy(
        vec![primary_addr.to_string()],
        vec![replica_addr.to_string()],
        &shutdown,
    )
    .await;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("http://{}/employee", proxy))
        .json(&json!({"name": "Ada", "position": "Engineer", "salary": 100.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    Replicator::new(replica, PrimaryFileSource::new(primary_path), DEFAULT_SYNC_INTERVAL)
        .unwrap()
        .run_cycle()
        .await
        .unwrap();

    let res = client.get(format!("http://{}/employee/{}", proxy, id)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let employee: Value = res.json().await.unwrap();
    assert_eq!(employee["name"], "Ada");

    shutdown.trigger();
}
