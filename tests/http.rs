//! HTTP API tests: an in-process server with fake providers, driven
//! over real sockets.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use askdoc::auth;
use askdoc::config::Config;
use askdoc::server::{router, AppState};

use common::{test_config, FakeChat, FakeEmbedder};

async fn spawn_server(config: Config, chat: FakeChat) -> (SocketAddr, Config) {
    let state = AppState::with_providers(
        config.clone(),
        Arc::new(FakeEmbedder::new()),
        Arc::new(chat),
        false,
    )
    .await
    .unwrap();

    let app = router(state).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, config)
}

async fn paris_server() -> (SocketAddr, Config) {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), "Paris is the capital of France.");
    // Leak the tempdir so the files outlive the test body.
    std::mem::forget(tmp);
    spawn_server(config, FakeChat::cooperative()).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _config) = paris_server().await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_query_returns_grounded_answer() {
    let (addr, _config) = paris_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/chat/query", addr))
        .json(&serde_json::json!({"question": "What is the capital of France?"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["answer"].as_str().unwrap().contains("Paris"));
}

#[tokio::test]
async fn test_query_out_of_scope_question() {
    let (addr, config) = paris_server().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{}/chat/query", addr))
        .json(&serde_json::json!({"question": "What is the capital of Japan?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["answer"].as_str().unwrap(),
        config.answer.out_of_scope_message
    );
}

#[tokio::test]
async fn test_query_provider_failure_maps_to_500_detail() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), "Paris is the capital of France.");
    std::mem::forget(tmp);

    let failing = FakeChat::replying(|_, _| anyhow::bail!("provider unreachable"));
    let (addr, _config) = spawn_server(config, failing).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/chat/query", addr))
        .json(&serde_json::json!({"question": "Anything?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("provider unreachable"));
}

#[tokio::test]
async fn test_signup_and_duplicate_conflict() {
    let (addr, _config) = paris_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/signup", addr))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["msg"], "User created successfully");

    // Same username, different email.
    let resp = client
        .post(format!("http://{}/signup", addr))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice2@example.com",
            "password": "hunter2",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Account already exists");

    // Same email, different username.
    let resp = client
        .post(format!("http://{}/signup", addr))
        .json(&serde_json::json!({
            "username": "bob",
            "email": "alice@example.com",
            "password": "hunter2",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_login_roundtrip_and_identical_failures() {
    let (addr, config) = paris_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{}/signup", addr))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2",
        }))
        .send()
        .await
        .unwrap();

    // Correct credentials: token decodes with the username as subject.
    let resp = client
        .post(format!("http://{}/login", addr))
        .json(&serde_json::json!({"username": "alice", "password": "hunter2"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "alice");

    let token = body["access_token"].as_str().unwrap();
    let claims = auth::decode_access_token(token, &config.auth).unwrap();
    assert_eq!(claims.sub, "alice");

    // Wrong password vs unknown username: identical status and body.
    let wrong_password = client
        .post(format!("http://{}/login", addr))
        .json(&serde_json::json!({"username": "alice", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(format!("http://{}/login", addr))
        .json(&serde_json::json!({"username": "mallory", "password": "wrong"}))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status().as_u16(), 400);
    assert_eq!(unknown_user.status().as_u16(), 400);

    let body_a: serde_json::Value = wrong_password.json().await.unwrap();
    let body_b: serde_json::Value = unknown_user.json().await.unwrap();
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["detail"], "Username or password is incorrect");
}

#[tokio::test]
async fn test_cors_allows_only_configured_origin() {
    let (addr, config) = paris_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/health", addr))
        .header("Origin", &config.server.cors_origin)
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some(config.server.cors_origin.as_str())
    );

    let resp = client
        .get(format!("http://{}/health", addr))
        .header("Origin", "http://evil.example.com")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}
