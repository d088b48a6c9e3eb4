use std::sync::Arc;
use std::time::Duration;

use crate::clients::{GoogleClient, JikanClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{CatalogService, LocalAuthenticator, OAuthAuthenticator};

/// Build a shared HTTP client with reasonable defaults for upstream calls.
/// Reused by every outbound client so connections are pooled.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("animark/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub jikan: Arc<JikanClient>,

    pub google: Arc<GoogleClient>,

    pub catalog: Arc<CatalogService>,

    pub local_auth: Arc<LocalAuthenticator>,

    pub oauth: Arc<OAuthAuthenticator>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.catalog.request_timeout_seconds)?;

        let jikan = Arc::new(JikanClient::with_shared_client(
            http_client.clone(),
            &config.catalog,
        ));
        let google = Arc::new(GoogleClient::with_shared_client(
            http_client,
            config.oauth.clone(),
        ));

        let catalog = Arc::new(CatalogService::new(
            store.clone(),
            jikan.clone(),
            Duration::from_millis(config.catalog.favorites_pacing_ms),
        ));
        let local_auth = Arc::new(LocalAuthenticator::new(
            store.clone(),
            config.security.clone(),
        ));
        let oauth = Arc::new(OAuthAuthenticator::new(store.clone()));

        Ok(Self {
            config: Arc::new(config),
            store,
            jikan,
            google,
            catalog,
            local_auth,
            oauth,
        })
    }
}
