//! End-to-end tests for fnhost-server.
//!
//! Each test starts a real server on an ephemeral port with its own
//! registry and artifact directories, then talks to it over HTTP.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fnhost_common::{BuildConfig, RuntimeConfig};
use fnhost_server::{FnServer, TestHandle};
use reqwest::StatusCode;
use tempfile::TempDir;

fn config(dir: &TempDir) -> RuntimeConfig {
    let mut config = RuntimeConfig::default().rooted_at(dir.path());
    config.build = BuildConfig {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            "cp \"$0\" \"$1\" && chmod +x \"$1\"".into(),
            "{source}".into(),
            "{output}".into(),
        ],
        source_extension: "sh".into(),
        timeout_ms: 5_000,
    };
    config
}

async fn start(dir: &TempDir) -> TestHandle {
    FnServer::start_test(&config(dir)).await.unwrap()
}

async fn register(
    client: &reqwest::Client,
    server: &TestHandle,
    name: &str,
    trigger: &str,
    body: &str,
) -> reqwest::Response {
    let payload = serde_json::json!({
        "name": name,
        "trigger": trigger,
        "code": STANDARD.encode(format!("#!/bin/sh\n{body}\n")),
    });
    client
        .put(format!("{}/register", server.url()))
        .json(&payload)
        .send()
        .await
        .unwrap()
}

// ============================================================================
// Test: Echo Scenario
// ============================================================================

#[tokio::test]
async fn test_echo_scenario() {
    let dir = TempDir::new().unwrap();
    let server = start(&dir).await;
    let client = reqwest::Client::new();

    let response = register(&client, &server, "echo", "http", "echo hi").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "Function registered");

    let response = client
        .get(format!("{}/echo", server.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("x-invocation-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "hi\n");

    server.shutdown().await;
}

// ============================================================================
// Test: Liveness
// ============================================================================

#[tokio::test]
async fn test_liveness() {
    let dir = TempDir::new().unwrap();
    let server = start(&dir).await;

    let response = reqwest::get(server.url()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.text().await.unwrap().is_empty());

    server.shutdown().await;
}

// ============================================================================
// Test: Cron Registration
// ============================================================================

#[tokio::test]
async fn test_cron_registration_is_scheduled_not_routed() {
    let dir = TempDir::new().unwrap();
    let server = start(&dir).await;
    let client = reqwest::Client::new();

    let response = register(&client, &server, "tick", "*/5 * * * *", "echo tick").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let scheduled = server.state().orchestrator().scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].function, "tick");
    assert!(scheduled[0].next_fire.is_some());

    let response = client
        .get(format!("{}/tick", server.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

// ============================================================================
// Test: Concurrent Registration
// ============================================================================

#[tokio::test]
async fn test_concurrent_registrations_both_persist() {
    let dir = TempDir::new().unwrap();
    let server = start(&dir).await;
    let client = reqwest::Client::new();

    let (alpha, beta) = tokio::join!(
        register(&client, &server, "alpha", "http", "echo alpha"),
        register(&client, &server, "beta", "http", "echo beta"),
    );
    assert_eq!(alpha.status(), StatusCode::CREATED);
    assert_eq!(beta.status(), StatusCode::CREATED);

    let registry = server.state().registry().load().await.unwrap();
    assert!(registry.contains_key("alpha"));
    assert!(registry.contains_key("beta"));

    for (name, expected) in [("alpha", "alpha\n"), ("beta", "beta\n")] {
        let body: serde_json::Value = client
            .get(format!("{}/{name}", server.url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["message"], expected);
    }

    server.shutdown().await;
}

// ============================================================================
// Test: Rebinding
// ============================================================================

#[tokio::test]
async fn test_http_to_cron_rebinding_removes_route() {
    let dir = TempDir::new().unwrap();
    let server = start(&dir).await;
    let client = reqwest::Client::new();
    let url = format!("{}/flip", server.url());

    register(&client, &server, "flip", "http", "echo v1").await;
    assert_eq!(
        client.get(&url).send().await.unwrap().status(),
        StatusCode::CREATED
    );

    register(&client, &server, "flip", "0 * * * *", "echo v2").await;
    assert_eq!(
        client.get(&url).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(server.state().registry().len(), 1);

    server.shutdown().await;
}

// ============================================================================
// Test: Restart
// ============================================================================

#[tokio::test]
async fn test_bindings_survive_restart() {
    let dir = TempDir::new().unwrap();
    let client = reqwest::Client::new();

    let server = start(&dir).await;
    register(&client, &server, "durable", "http", "echo still here").await;
    server.shutdown().await;

    let server = start(&dir).await;
    let body: serde_json::Value = client
        .get(format!("{}/durable", server.url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "still here\n");

    server.shutdown().await;
}
