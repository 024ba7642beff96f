//! shopcore HTTP server binary.

use anyhow::Context;
use shopcore_postgres::PostgresShopStore;
use shopcore_server::config::ServerConfig;
use shopcore_server::{router, AppState};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("loading configuration")?;
    let store =
        PostgresShopStore::with_config(config.database_url.clone(), config.postgres.clone())
            .await
            .context("connecting to postgres")?;
    store.migrate().await.context("running migrations")?;

    let app = router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "[server.start] listening");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
