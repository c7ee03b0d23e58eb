use axum::body::Body;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::activity_log::ActivityLog;
use crate::geo::{GeoClient, GeoInfo, UNAVAILABLE, UNKNOWN};
use crate::net;

const DEFAULT_DOWNLOAD_SIZE: u64 = 1024 * 1024;
const MAX_DOWNLOAD_SIZE: u64 = 16 * 1024 * 1024;
const DOWNLOAD_CHUNK_SIZE: u64 = 65536;

/// Shared state для всех endpoints.
#[derive(Clone)]
pub struct AppState {
    pub activity_log: Arc<ActivityLog>,
    pub geo: Arc<GeoClient>,
}

/// Результаты теста, присланные Mini App. Все поля обязательны; запрос без
/// какого-либо из них отклоняется слоем валидации axum до хендлера.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub ping: String,
    pub download: String,
    pub upload: String,
    pub client_info: String,
    pub full_log: String,
}

#[derive(Debug, Serialize)]
pub struct GeoInfoResponse {
    pub user: GeoInfo,
    pub server: GeoInfo,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub size: Option<u64>,
}

/// Заголовки, запрещающие любым кешам отдавать сохраненный ответ: точность
/// замеров требует, чтобы каждый запрос доходил до сервера.
fn no_cache_headers() -> [(HeaderName, &'static str); 3] {
    [
        (
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, max-age=0",
        ),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ]
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/get_geo_info", get(get_geo_info))
        .route("/log_results", post(log_results))
        .route("/ping", get(ping))
        .route("/download", get(download))
        .route("/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /get_geo_info — геоданные клиента и сервера. Всегда 200: отказ
/// внешнего сервиса превращается в значения-заглушки, не в ошибку.
async fn get_geo_info(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<GeoInfoResponse> {
    let user_ip = net::client_ip(&headers, addr.ip()).to_string();

    let mut user = GeoInfo::unavailable(&user_ip);
    match state.geo.lookup(Some(&user_ip)).await {
        Ok(lookup) => {
            user.country = lookup.country.unwrap_or_else(|| UNKNOWN.to_string());
            user.city = lookup.city.unwrap_or_else(|| UNKNOWN.to_string());
            let entry = format!(
                "VISIT from IP: {}, Location: {}, {}",
                user_ip, user.city, user.country
            );
            if let Err(e) = state.activity_log.log(&entry).await {
                error!("Failed to write visit entry: {e:#}");
            }
        }
        Err(e) => {
            warn!("Geo lookup for {user_ip} failed: {e:#}");
            let entry = format!("VISIT from IP: {}, Geo lookup failed: {}", user_ip, e);
            if let Err(e) = state.activity_log.log(&entry).await {
                error!("Failed to write visit error entry: {e:#}");
            }
        }
    }

    let mut server = GeoInfo::unavailable(UNAVAILABLE);
    match state.geo.lookup(None).await {
        Ok(lookup) => {
            server.ip = lookup.query.unwrap_or_else(|| UNKNOWN.to_string());
            server.country = lookup.country.unwrap_or_else(|| UNKNOWN.to_string());
            server.city = lookup.city.unwrap_or_else(|| UNKNOWN.to_string());
        }
        Err(e) => {
            warn!("Server geo lookup failed: {e:#}");
        }
    }

    Json(GeoInfoResponse { user, server })
}

/// POST /log_results — две записи в журнал: однострочная сводка и
/// многострочный блок с полным логом клиента.
async fn log_results(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(results): Json<TestResult>,
) -> Json<serde_json::Value> {
    let user_ip = net::client_ip(&headers, addr.ip()).to_string();

    let summary = format!(
        "TEST from IP: {}, {}, Ping: {}, Download: {}, Upload: {}",
        user_ip, results.client_info, results.ping, results.download, results.upload
    );
    let details = format!(
        "--- TEST DETAILS (IP: {ip}) ---\n{log}\n--- END OF TEST (IP: {ip}) ---",
        ip = user_ip,
        log = results.full_log
    );

    if let Err(e) = state.activity_log.log(&summary).await {
        error!("Failed to write test summary: {e:#}");
    }
    if let Err(e) = state.activity_log.log(&details).await {
        error!("Failed to write test details: {e:#}");
    }

    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /ping — фиксированный крошечный ответ для замера задержки.
async fn ping() -> impl IntoResponse {
    (no_cache_headers(), "pong")
}

/// GET /download?size=N — поток случайных байтов кусками по 64 КиБ.
/// Данные генерируются инкрементально; между кусками короткая пауза,
/// уступающая управление другим задачам (это не ограничитель скорости).
async fn download(Query(params): Query<DownloadParams>) -> impl IntoResponse {
    let total = params
        .size
        .unwrap_or(DEFAULT_DOWNLOAD_SIZE)
        .min(MAX_DOWNLOAD_SIZE);

    let stream = futures::stream::unfold(0u64, move |sent| async move {
        if sent >= total {
            return None;
        }
        if sent > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let len = DOWNLOAD_CHUNK_SIZE.min(total - sent) as usize;
        let mut chunk = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut chunk);
        Some((Ok::<Bytes, Infallible>(chunk.into()), sent + len as u64))
    });

    (
        no_cache_headers(),
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
}

/// POST /upload — вычитывает и отбрасывает тело запроса; клиент меряет
/// скорость отправки по времени до ответа.
async fn upload(body: Body) -> impl IntoResponse {
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        if chunk.is_err() {
            break;
        }
    }

    (StatusCode::OK, no_cache_headers(), "OK")
}
