//! Boots the real HTTP server on an ephemeral port and talks to it over TCP.

use school_portal::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, create_router,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};

async fn spawn_server() -> SocketAddr {
    let state = AppState {
        repo: Arc::new(InMemoryRepository::new()),
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_health_over_http() {
    let addr = spawn_server().await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_unauthenticated_request_gets_envelope() {
    let addr = spawn_server().await;

    let response = reqwest::Client::new()
        .get(format!("http://{}/api/messages/inbox", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "authentication required");
}
