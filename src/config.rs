use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    /// Проверяется в /start: должен быть https-адресом Mini App.
    pub web_app_url: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            telegram_token: env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN environment variable is required")?,
            web_app_url: env::var("WEB_APP_URL").ok(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub activity_log: PathBuf,
    pub geo_api_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {port:?}"))?,
            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".to_string())
                .into(),
            activity_log: env::var("ACTIVITY_LOG")
                .unwrap_or_else(|_| "activity.log".to_string())
                .into(),
            geo_api_url: env::var("GEO_API_URL")
                .unwrap_or_else(|_| "http://ip-api.com".to_string()),
        })
    }
}
