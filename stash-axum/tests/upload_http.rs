use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use stash_axum::{axum, AxumApp};
use stash_blob::{
    BlobError, BlobResult, LocalFsStore, PutResult, StorageLocation, UploadPipeline, UploadStore,
};
use stash_core::{StorageKey, UploadPolicy};
use tower::ServiceExt;

const BOUNDARY: &str = "stash-test-boundary";

/// Delegates to a local store and counts write calls.
struct RecordingStore {
    inner: LocalFsStore,
    writes: AtomicUsize,
}

#[async_trait::async_trait]
impl UploadStore for RecordingStore {
    async fn write(
        &self,
        key: &StorageKey,
        bytes: Bytes,
        mime_type: &str,
    ) -> BlobResult<PutResult> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, bytes, mime_type).await
    }

    fn public_url(&self, location: &StorageLocation) -> BlobResult<String> {
        self.inner.public_url(location)
    }

    async fn delete(&self, location: &StorageLocation) -> BlobResult<()> {
        self.inner.delete(location).await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

struct NetworkDownStore;

#[async_trait::async_trait]
impl UploadStore for NetworkDownStore {
    async fn write(&self, _key: &StorageKey, _bytes: Bytes, _mime: &str) -> BlobResult<PutResult> {
        Err(BlobError::backend(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }

    fn public_url(&self, _location: &StorageLocation) -> BlobResult<String> {
        Err(BlobError::invalid("nothing was stored"))
    }

    async fn delete(&self, _location: &StorageLocation) -> BlobResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "network-down"
    }
}

async fn recording_app(root: &Path, policy: UploadPolicy) -> (AxumApp, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore {
        inner: LocalFsStore::open(root, "/uploads").await.unwrap(),
        writes: AtomicUsize::new(0),
    });
    let ax = axum(UploadPipeline::new(store.clone(), policy))
        .use_upload("/api/upload")
        .use_get("/health", || async { "ok" })
        .serve_dir("/uploads", store.inner.root())
        .with_http_layers();
    (ax, store)
}

fn file_part(filename: &str, mime: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    out.extend_from_slice(payload);
    out.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn text_only() -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

fn post(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn valid_png_is_stored_and_described() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let payload = vec![0x89u8; 1024];
    let res = ax
        .router
        .oneshot(post(file_part("photo.png", "image/png", &payload)))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    let key = body["filename"].as_str().unwrap().to_string();

    assert_eq!(body["success"], true);
    assert_eq!(body["size"], 1024);
    assert_eq!(body["mimetype"], "image/png");
    assert!(key.ends_with("-photo.png"));
    assert_eq!(body["url"], format!("/uploads/{key}"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(store.inner.root().join(&key)).unwrap(), payload);
}

#[tokio::test]
async fn disallowed_type_is_rejected_without_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let res = ax
        .router
        .oneshot(post(file_part("malware.exe", "application/x-msdownload", b"MZ\x90\x00")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid file type"));
    assert!(body.get("url").is_none());
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_dir(store.inner.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn request_without_file_part_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let res = ax.router.oneshot(post(text_only())).await.unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file uploaded");
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_file_is_rejected_without_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let policy = UploadPolicy::default().with_max_file_bytes(1024);
    let (ax, store) = recording_app(dir.path(), policy).await;

    let res = ax
        .router
        .oneshot(post(file_part("big.png", "image/png", &vec![1u8; 4096])))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert!(body["error"].as_str().unwrap().contains("too large"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storage_failure_returns_500_without_url() {
    let pipeline = UploadPipeline::new(Arc::new(NetworkDownStore), UploadPolicy::default());
    let ax = axum(pipeline).use_upload("/api/upload").with_http_layers();

    let res = ax
        .router
        .oneshot(post(file_part("photo.png", "image/png", b"png")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("connection reset by peer"));
    assert!(body.get("url").is_none());
    assert!(body.get("filename").is_none());
}

#[tokio::test]
async fn non_post_methods_get_405_with_allow_header() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, store) = recording_app(dir.path(), UploadPolicy::default()).await;

    for method in ["GET", "PUT", "DELETE"] {
        let res = ax
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/api/upload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 405, "{method}");
        assert_eq!(res.headers().get("allow").unwrap(), "POST");
        let body = json_body(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Method Not Allowed");
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_uploads_with_same_name_both_persist() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, _store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let (a, b) = tokio::join!(
        ax.router
            .clone()
            .oneshot(post(file_part("same.png", "image/png", b"first"))),
        ax.router
            .clone()
            .oneshot(post(file_part("same.png", "image/png", b"second"))),
    );
    let a = json_body(a.unwrap()).await;
    let b = json_body(b.unwrap()).await;

    assert_eq!(a["success"], true);
    assert_eq!(b["success"], true);
    assert_ne!(a["filename"], b["filename"]);

    for (body, expected) in [(a, &b"first"[..]), (b, &b"second"[..])] {
        let res = ax
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(body["url"].as_str().unwrap())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        let served = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&served[..], expected);
    }
}

#[tokio::test]
async fn traversal_filenames_stay_inside_uploads_root() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let (ax, store) = recording_app(&uploads, UploadPolicy::default()).await;

    for raw in ["../../etc/passwd.png", "..\\..\\evil.png", "/tmp/abs.png"] {
        let res = ax
            .router
            .clone()
            .oneshot(post(file_part(raw, "image/png", b"x")))
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200, "{raw}");

        let body = json_body(res).await;
        let key = body["filename"].as_str().unwrap();
        assert!(!key.contains('/') && !key.contains('\\') && !key.contains(".."), "{raw} -> {key}");
        assert!(store.inner.root().join(key).is_file(), "{raw} -> {key}");
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, _store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let provided = HeaderValue::from_static("req-test-123");
    let mut req = post(text_only());
    req.headers_mut().insert("x-request-id", provided.clone());
    let res = ax.router.oneshot(req).await.unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn health_route_answers_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, _store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let res = ax
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn files_above_axum_default_limit_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (ax, store) = recording_app(dir.path(), UploadPolicy::default()).await;

    let payload = vec![3u8; 5 * 1024 * 1024];
    let res = ax
        .router
        .oneshot(post(file_part("large.png", "image/png", &payload)))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["size"], 5 * 1024 * 1024);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}
