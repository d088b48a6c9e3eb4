use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::models::Anime;

/// Every way an upstream call can go wrong collapses into this one error;
/// callers only ever answer it with a generic 500.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Upstream {operation} failed: {message}")]
    Upstream {
        operation: &'static str,
        message: String,
    },
}

impl CatalogError {
    fn upstream(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JikanResponse<T> {
    data: Option<T>,
}

#[derive(Clone)]
pub struct JikanClient {
    client: Client,
    base_url: String,
    lookup_retries: u32,
    retry_delay: Duration,
}

impl JikanClient {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("animark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build catalog HTTP client: {e}"))?;

        Ok(Self::with_shared_client(client, config))
    }

    #[must_use]
    pub fn with_shared_client(client: Client, config: &CatalogConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lookup_retries: config.lookup_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub async fn fetch_top_page(&self, page: u32) -> Result<Vec<Anime>, CatalogError> {
        let url = format!("{}/top/anime?page={}", self.base_url, page);
        self.get_list("top", &url).await
    }

    pub async fn search_by_query(&self, query: &str) -> Result<Vec<Anime>, CatalogError> {
        let url = format!("{}/anime?q={}", self.base_url, urlencoding::encode(query));
        self.get_list("search", &url).await
    }

    pub async fn fetch_by_genre(&self, genre_id: u32, page: u32) -> Result<Vec<Anime>, CatalogError> {
        let url = format!(
            "{}/anime?genres={}&order_by=score&sort=desc&page={}",
            self.base_url, genre_id, page
        );
        self.get_list("genre", &url).await
    }

    /// Looks up a single record, retrying failed attempts with a fixed delay.
    /// Exhausted retries yield `None`: callers treat a miss as skippable.
    pub async fn fetch_by_id(&self, mal_id: i64) -> Option<Anime> {
        let attempts = self.lookup_retries + 1;

        for attempt in 1..=attempts {
            match self.try_fetch_by_id(mal_id).await {
                Ok(anime) => return anime,
                Err(e) if attempt < attempts => {
                    debug!(mal_id, attempt, error = %e, "Catalog lookup failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(mal_id, attempts, error = %e, "Catalog lookup gave up");
                }
            }
        }

        None
    }

    async fn try_fetch_by_id(&self, mal_id: i64) -> Result<Option<Anime>, CatalogError> {
        let url = format!("{}/anime/{}", self.base_url, mal_id);
        let response: JikanResponse<Anime> = self.get_json("lookup", &url).await?;
        Ok(response.data)
    }

    async fn get_list(&self, operation: &'static str, url: &str) -> Result<Vec<Anime>, CatalogError> {
        let response: JikanResponse<Vec<Anime>> = self.get_json(operation, url).await?;

        response
            .data
            .ok_or_else(|| CatalogError::upstream(operation, "response carried no data array"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, CatalogError> {
        let result = self.send(operation, url).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("catalog_requests_total", "operation" => operation, "outcome" => outcome)
            .increment(1);

        result
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, CatalogError> {
        debug!(operation, url, "Catalog request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::upstream(operation, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::upstream(
                operation,
                format!("Jikan API error: {status} - {body}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::upstream(operation, format!("invalid payload: {e}")))
    }
}
