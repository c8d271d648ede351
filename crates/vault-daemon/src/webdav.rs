use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use vault_core::FileChangeKind;
use vault_watch::FileChangeNotifier;

/// A deliberately thin WebDAV-shaped front end: it performs the filesystem
/// mutation and fires `notify_application_change`, but does not implement
/// DAV XML property semantics (PROPFIND/PROPPATCH return a fixed minimal
/// body). Full WebDAV compliance is out of scope — see the processing core
/// in `vault-core`/`vault-chunker`/`vault-archive`/`vault-index` for the
/// part of this system that matters.
pub struct WebdavState {
    pub vault_root: PathBuf,
    pub notifier: Arc<FileChangeNotifier>,
}

pub fn router(state: Arc<WebdavState>) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .route("/{*path}", any(handle))
        .with_state(state)
}

async fn handle_root(state: State<Arc<WebdavState>>, method: Method, headers: HeaderMap, body: Bytes) -> Response {
    dispatch(state, method, String::new(), headers, body).await
}

async fn handle(
    state: State<Arc<WebdavState>>,
    method: Method,
    AxumPath(path): AxumPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, method, path, headers, body).await
}

async fn dispatch(
    State(state): State<Arc<WebdavState>>,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method.as_str() {
        "GET" => get_file(&state, &path).await,
        "PUT" => put_file(&state, &path, body).await,
        "DELETE" => delete_file(&state, &path).await,
        "OPTIONS" => options_response(),
        "PROPFIND" => propfind_response(),
        "PROPPATCH" => proppatch_response(),
        "MKCOL" => mkcol(&state, &path).await,
        "COPY" => copy_or_move(&state, &path, &headers, FileChangeKind::Copied).await,
        "MOVE" => copy_or_move(&state, &path, &headers, FileChangeKind::Moved).await,
        "LOCK" => lock_response(),
        "UNLOCK" => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn resolve(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}

async fn get_file(state: &WebdavState, relative: &str) -> Response {
    let full = resolve(&state.vault_root, relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => (StatusCode::OK, bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_file(state: &WebdavState, relative: &str, body: Bytes) -> Response {
    let full = resolve(&state.vault_root, relative);
    if let Some(parent) = full.parent() {
        if tokio::fs::create_dir_all(parent).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let existed = full.exists();
    match tokio::fs::write(&full, &body).await {
        Ok(()) => {
            let kind = if existed {
                FileChangeKind::Modified
            } else {
                FileChangeKind::Created
            };
            notify(state, kind, relative, &full, None, None).await;
            if existed {
                StatusCode::NO_CONTENT.into_response()
            } else {
                StatusCode::CREATED.into_response()
            }
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn delete_file(state: &WebdavState, relative: &str) -> Response {
    let full = resolve(&state.vault_root, relative);
    let is_directory = full.is_dir();
    let result = if is_directory {
        tokio::fs::remove_dir_all(&full).await
    } else {
        tokio::fs::remove_file(&full).await
    };

    match result {
        Ok(()) => {
            notify(state, FileChangeKind::Deleted, relative, &full, None, None).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn mkcol(state: &WebdavState, relative: &str) -> Response {
    let full = resolve(&state.vault_root, relative);
    match tokio::fs::create_dir(&full).await {
        Ok(()) => {
            notify(state, FileChangeKind::Created, relative, &full, None, None).await;
            StatusCode::CREATED.into_response()
        }
        Err(_) => StatusCode::CONFLICT.into_response(),
    }
}

/// Resolves the `Destination` header and performs a copy or rename,
/// reporting the kind the caller asked for (`Copied` for COPY, `Moved` for
/// MOVE, matching §6's mutating-method contract).
async fn copy_or_move(state: &WebdavState, relative: &str, headers: &HeaderMap, kind: FileChangeKind) -> Response {
    let Some(destination) = destination_relative_path(headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let source_full = resolve(&state.vault_root, relative);
    let dest_full = resolve(&state.vault_root, &destination);

    if let Some(parent) = dest_full.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }

    let result = match kind {
        FileChangeKind::Copied => tokio::fs::copy(&source_full, &dest_full).await.map(|_| ()),
        _ => tokio::fs::rename(&source_full, &dest_full).await,
    };

    match result {
        Ok(()) => {
            let is_directory = dest_full.is_dir();
            notify(
                state,
                kind,
                &destination,
                &dest_full,
                Some(relative.to_string()),
                Some(source_full.to_string_lossy().into_owned()),
            )
            .await;
            let _ = is_directory;
            StatusCode::CREATED.into_response()
        }
        Err(_) => StatusCode::CONFLICT.into_response(),
    }
}

fn destination_relative_path(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("Destination")?.to_str().ok()?;
    // Destination is typically a full URL; keep only the path component.
    let path = raw.rsplit_once("://").map(|(_, rest)| rest).unwrap_or(raw);
    let path = path.splitn(2, '/').nth(1).unwrap_or(path);
    Some(path.to_string())
}

async fn notify(
    state: &WebdavState,
    kind: FileChangeKind,
    relative: &str,
    full: &Path,
    old_relative: Option<String>,
    old_physical: Option<String>,
) {
    state
        .notifier
        .notify_application_change(
            kind,
            relative.to_string(),
            full.to_string_lossy().into_owned(),
            full.is_dir(),
            old_relative,
            old_physical,
        )
        .await;
}

fn options_response() -> Response {
    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert("DAV", HeaderValue::from_static("1, 2"));
    response.headers_mut().insert(
        "Allow",
        HeaderValue::from_static("GET, PUT, DELETE, OPTIONS, PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK"),
    );
    response
}

/// Minimal fixed-body response: this front end does not model DAV
/// properties, only enough of the protocol surface to exercise the
/// notifier end to end.
fn propfind_response() -> Response {
    let body = r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:"></D:multistatus>"#;
    (StatusCode::MULTI_STATUS, body).into_response()
}

fn proppatch_response() -> Response {
    let body = r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:"></D:multistatus>"#;
    (StatusCode::MULTI_STATUS, body).into_response()
}

fn lock_response() -> Response {
    let body = r#"<?xml version="1.0" encoding="utf-8"?><D:prop xmlns:D="DAV:"><D:lockdiscovery/></D:prop>"#;
    (StatusCode::OK, body).into_response()
}
