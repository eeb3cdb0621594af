use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ingest_uploader::UploadConfig;
use tower::ServiceExt;

async fn test_router(dir: &tempfile::TempDir) -> axum::Router {
    let state = ingestd::ws::ServerState::new(
        PathBuf::from(dir.path()),
        Duration::from_secs(10),
        UploadConfig::disabled(),
    )
    .await;
    ingestd::routes::build_router(state)
}

#[tokio::test]
async fn hello_route_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(&dir).await;
    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello");
}

#[tokio::test]
async fn echo_route_reflects_body() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(&dir).await;
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from("ping"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ping");
}

#[tokio::test]
async fn ws_route_without_upgrade_headers_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(&dir).await;
    let response = router
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
}
