pub mod api;
pub mod cli;
pub mod client;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tower_sessions::session_store::ExpiredDeletion;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, cmd_browse, cmd_init, cmd_search, cmd_top};
pub use config::Config;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, prometheus_handle).await,
        Commands::Init => cmd_init(),
        Commands::Browse { server } => cmd_browse(&server).await,
        Commands::Top { page } => cmd_top(&config, page).await,
        Commands::Search { query } => cmd_search(&config, &query.join(" ")).await,
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "animark")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Animark v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.oauth.google_enabled() {
        info!("Google login enabled");
    }

    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;

    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let deletion_handle = {
        let store = api_state.session_store.clone();
        tokio::spawn(async move {
            if let Err(e) = store
                .continuously_delete_expired(Duration::from_secs(60))
                .await
            {
                error!("Session cleanup error: {}", e);
            }
        })
    };

    let app = api::router(api_state);
    let addr = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    deletion_handle.abort();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
