//! Integration tests for the speed-test HTTP endpoints.
//!
//! Uses `tower::ServiceExt::oneshot` to call the router without binding a
//! real TCP port. The geolocation client points at a closed local port, so
//! upstream lookups fail fast and exercise the sentinel fallback paths.

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use pro_speed_test::activity_log::ActivityLog;
use pro_speed_test::geo::GeoClient;
use pro_speed_test::server::{build_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // .oneshot()

const PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 54321);
const BODY_LIMIT: usize = 32 * 1024 * 1024;

// ── Helpers ───────────────────────────────────────────────────

async fn make_app(dir: &TempDir) -> (axum::Router, PathBuf) {
    let log_path = dir.path().join("activity.log");
    let activity_log = Arc::new(ActivityLog::open(&log_path).await.unwrap());
    // Closed port: every lookup errors out immediately.
    let geo = Arc::new(GeoClient::new("http://127.0.0.1:9".to_string()));
    let app = build_router(AppState { activity_log, geo }, dir.path());
    (app, log_path)
}

fn with_peer(mut req: Request<Body>) -> Request<Body> {
    req.extensions_mut()
        .insert(ConnectInfo::<SocketAddr>(PEER.into()));
    req
}

fn get_req(uri: &str) -> Request<Body> {
    with_peer(Request::builder().uri(uri).body(Body::empty()).unwrap())
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    with_peer(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ── /ping ─────────────────────────────────────────────────────

#[tokio::test]
async fn ping_returns_pong_with_no_cache_headers() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app.oneshot(get_req("/ping")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["cache-control"],
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    assert_eq!(resp.headers()["pragma"], "no-cache");
    assert_eq!(resp.headers()["expires"], "0");

    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"pong");
}

// ── /download ─────────────────────────────────────────────────

#[tokio::test]
async fn download_default_is_one_mebibyte() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app.oneshot(get_req("/download")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert_eq!(resp.headers()["pragma"], "no-cache");

    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(bytes.len(), 1_048_576);
}

#[tokio::test]
async fn download_honors_exact_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app.oneshot(get_req("/download?size=500000")).await.unwrap();
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(bytes.len(), 500_000);
}

#[tokio::test]
async fn download_caps_oversized_requests_at_sixteen_mebibytes() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app
        .oneshot(get_req("/download?size=999999999"))
        .await
        .unwrap();
    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(bytes.len(), 16_777_216);
}

// ── /upload ───────────────────────────────────────────────────

#[tokio::test]
async fn upload_accepts_and_discards_a_body() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let req = with_peer(
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(Body::from(vec![0u8; 300_000]))
            .unwrap(),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["pragma"], "no-cache");

    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn upload_accepts_an_empty_body() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let req = with_peer(
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(Body::empty())
            .unwrap(),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ── /log_results ──────────────────────────────────────────────

#[tokio::test]
async fn log_results_appends_summary_and_detail_block() {
    let dir = tempfile::tempdir().unwrap();
    let (app, log_path) = make_app(&dir).await;

    let payload = serde_json::json!({
        "ping": "41.3 ms",
        "download": "88.1 Mbps",
        "upload": "23.5 Mbps",
        "clientInfo": "Riga, Latvia (IP: 203.0.113.7)",
        "fullLog": "line one\nline two"
    });
    let mut req = json_post("/log_results", payload);
    req.headers_mut()
        .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let j = body_json(resp).await;
    assert_eq!(j["status"], "ok");

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains(
        "TEST from IP: 203.0.113.7, Riga, Latvia (IP: 203.0.113.7), \
         Ping: 41.3 ms, Download: 88.1 Mbps, Upload: 23.5 Mbps"
    ));
    assert!(log.contains("--- TEST DETAILS (IP: 203.0.113.7) ---"));
    assert!(log.contains("line one\nline two"));
    assert!(log.contains("--- END OF TEST (IP: 203.0.113.7) ---"));
    // Ровно два вызова журнала: сводка и блок деталей.
    assert_eq!(log.matches("TEST from IP").count(), 1);
}

#[tokio::test]
async fn log_results_missing_field_is_rejected_before_handler() {
    let dir = tempfile::tempdir().unwrap();
    let (app, log_path) = make_app(&dir).await;

    // fullLog omitted — схема требует все пять полей.
    let payload = serde_json::json!({
        "ping": "41.3 ms",
        "download": "88.1 Mbps",
        "upload": "23.5 Mbps",
        "clientInfo": "somewhere"
    });
    let resp = app.oneshot(json_post("/log_results", payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("TEST from IP"));
}

#[tokio::test]
async fn log_results_non_string_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let payload = serde_json::json!({
        "ping": 41.3,
        "download": "88.1 Mbps",
        "upload": "23.5 Mbps",
        "clientInfo": "somewhere",
        "fullLog": "log"
    });
    let resp = app.oneshot(json_post("/log_results", payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── /get_geo_info ─────────────────────────────────────────────

#[tokio::test]
async fn geo_info_is_200_with_sentinels_when_upstream_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let (app, log_path) = make_app(&dir).await;

    let mut req = get_req("/get_geo_info");
    req.headers_mut()
        .insert("x-forwarded-for", "198.51.100.23".parse().unwrap());

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let j = body_json(resp).await;
    assert_eq!(j["user"]["ip"], "198.51.100.23");
    assert_eq!(j["user"]["country"], "Недоступно");
    assert_eq!(j["server"]["ip"], "Недоступно");
    assert_eq!(j["server"]["country"], "Недоступно");
    assert!(j["user"]["city"].is_string());
    assert!(j["server"]["city"].is_string());

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("VISIT from IP: 198.51.100.23, Geo lookup failed"));
}

#[tokio::test]
async fn geo_info_falls_back_to_peer_address_without_forwarded_header() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app.oneshot(get_req("/get_geo_info")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let j = body_json(resp).await;
    assert_eq!(j["user"]["ip"], "127.0.0.1");
}

// ── Landing page ──────────────────────────────────────────────

#[tokio::test]
async fn root_serves_the_landing_page() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body>Pro Speed Test</body></html>",
    )
    .unwrap();
    let (app, _) = make_app(&dir).await;

    let resp = app.oneshot(get_req("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert!(std::str::from_utf8(&bytes).unwrap().contains("Pro Speed Test"));
}
