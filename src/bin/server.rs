use anyhow::{Context, Result};
use pro_speed_test::activity_log::ActivityLog;
use pro_speed_test::config::ServerConfig;
use pro_speed_test::geo::GeoClient;
use pro_speed_test::server::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    let activity_log = Arc::new(ActivityLog::open(&config.activity_log).await?);
    let geo = Arc::new(GeoClient::new(config.geo_api_url.clone()));

    let app = build_router(AppState { activity_log, geo }, &config.static_dir);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Speed test server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
