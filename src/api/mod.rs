use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::state::SharedState;

mod assets;
pub mod auth;
mod catalog;
mod error;
mod favorites;
mod observability;
mod request_kind;
mod types;
pub mod views;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use request_kind::RequestKind;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

/// Name of the HTTP-only cookie carrying the session id.
pub const SESSION_COOKIE: &str = "animark.sid";

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub session_store: SqliteStore,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn catalog(&self) -> &crate::services::CatalogService {
        &self.shared.catalog
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let session_store = SqliteStore::new(shared.store.sqlite_pool());
    session_store
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to migrate session store: {e}"))?;

    Ok(Arc::new(AppState {
        shared,
        session_store,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared, prometheus_handle).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;

    let session_layer = SessionManagerLayer::new(state.session_store.clone())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_secure(server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnSessionEnd);

    Router::new()
        .route("/", get(catalog::index))
        .route("/genre", get(catalog::genre))
        .route("/search", get(catalog::search))
        .route("/favorites", get(favorites::list_favorites))
        .route("/favorites/add", post(favorites::add_favorite))
        .route("/favorites/remove", post(favorites::remove_favorite))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", get(auth::logout))
        .route("/auth/google", get(auth::google_start))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/static/{*path}", get(assets::serve_asset))
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn(observability::track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer),
        )
        .with_state(state)
}
