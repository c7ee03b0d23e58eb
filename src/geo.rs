use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Значения-заглушки, когда геоданные получить не удалось.
pub const UNAVAILABLE: &str = "Недоступно";
pub const UNKNOWN: &str = "Неизвестно";

/// Ответ ip-api.com (используется подмножество полей).
#[derive(Debug, Deserialize)]
pub struct GeoLookup {
    pub status: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// IP, по которому выполнялся запрос; для запроса без адреса —
    /// внешний IP самого сервера.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoInfo {
    pub ip: String,
    pub country: String,
    pub city: String,
}

impl GeoInfo {
    pub fn unavailable(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: UNAVAILABLE.to_string(),
            city: String::new(),
        }
    }
}

pub struct GeoClient {
    base_url: String,
    client: reqwest::Client,
}

impl GeoClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Один запрос к сервису геолокации, без повторов. `None` означает
    /// "определи мой собственный внешний адрес".
    pub async fn lookup(&self, ip: Option<&str>) -> Result<GeoLookup> {
        let url = match ip {
            Some(ip) => format!("{}/json/{}", self.base_url, ip),
            None => format!("{}/json/", self.base_url),
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach geolocation service")?;

        if !response.status().is_success() {
            anyhow::bail!("Geolocation service error: {}", response.status());
        }

        let lookup: GeoLookup = response
            .json()
            .await
            .context("Failed to parse geolocation response")?;

        if lookup.status != "success" {
            anyhow::bail!("Geolocation lookup returned status {:?}", lookup.status);
        }

        Ok(lookup)
    }
}
