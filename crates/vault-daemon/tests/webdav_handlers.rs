//! Exercises the WebDAV front end's HTTP surface directly against its
//! `axum::Router`, without binding a socket: PUT/GET/DELETE round-trip the
//! filesystem and each mutation fires a notifier event, OPTIONS advertises
//! the supported method set.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;
use vault_daemon::webdav::{self, WebdavState};
use vault_watch::FileChangeNotifier;

fn build_router(temp: &TempDir) -> (axum::Router, std::sync::Arc<FileChangeNotifier>) {
    let notifier = FileChangeNotifier::new();
    let state = Arc::new(WebdavState {
        vault_root: temp.path().to_path_buf(),
        notifier: std::sync::Arc::clone(&notifier),
    });
    (webdav::router(state), notifier)
}

#[tokio::test]
async fn put_creates_a_file_and_fires_a_created_event() {
    let temp = TempDir::new().unwrap();
    let (router, notifier) = build_router(&temp);
    let receiver = notifier.subscribe();

    let request = Request::builder()
        .method("PUT")
        .uri("/doc.txt")
        .body(Body::from("hello vault"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let on_disk = tokio::fs::read_to_string(temp.path().join("doc.txt")).await.unwrap();
    assert_eq!(on_disk, "hello vault");

    let event = tokio::time::timeout(Duration::from_millis(200), receiver.recv_async())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.relative_path, "doc.txt");
    assert!(matches!(event.kind, vault_core::FileChangeKind::Created));
}

#[tokio::test]
async fn put_over_an_existing_file_reports_modified() {
    let temp = TempDir::new().unwrap();
    tokio::fs::write(temp.path().join("doc.txt"), "old").await.unwrap();
    let (router, notifier) = build_router(&temp);
    let receiver = notifier.subscribe();

    let request = Request::builder()
        .method("PUT")
        .uri("/doc.txt")
        .body(Body::from("new"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let event = tokio::time::timeout(Duration::from_millis(200), receiver.recv_async())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event.kind, vault_core::FileChangeKind::Modified));
}

#[tokio::test]
async fn get_missing_file_is_404() {
    let temp = TempDir::new().unwrap();
    let (router, _notifier) = build_router(&temp);

    let request = Request::builder().method("GET").uri("/missing.txt").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_file_and_fires_a_deleted_event() {
    let temp = TempDir::new().unwrap();
    tokio::fs::write(temp.path().join("doc.txt"), "bye").await.unwrap();
    let (router, notifier) = build_router(&temp);
    let receiver = notifier.subscribe();

    let request = Request::builder().method("DELETE").uri("/doc.txt").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!temp.path().join("doc.txt").exists());
    let event = tokio::time::timeout(Duration::from_millis(200), receiver.recv_async())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event.kind, vault_core::FileChangeKind::Deleted));
}

#[tokio::test]
async fn options_advertises_the_supported_methods() {
    let temp = TempDir::new().unwrap();
    let (router, _notifier) = build_router(&temp);

    let request = Request::builder().method("OPTIONS").uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allow = response.headers().get("Allow").unwrap().to_str().unwrap();
    assert!(allow.contains("PROPFIND"));
    assert!(allow.contains("MKCOL"));
}

#[tokio::test]
async fn mkcol_creates_a_directory() {
    let temp = TempDir::new().unwrap();
    let (router, _notifier) = build_router(&temp);

    let request = Request::builder().method("MKCOL").uri("/subdir").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(temp.path().join("subdir").is_dir());
}
