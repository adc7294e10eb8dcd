use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use studyflow_server::api::{self, AppState};
use studyflow_server::auth::AuthConfig;
use studyflow_server::config::AppConfig;
use studyflow_server::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting studyflow server");
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let db = db::init_pool_and_migrate(&config.database_url)
        .await
        .context("failed to initialize database")?;
    info!("database ready, migrations applied");

    let auth = AuthConfig::new(config.jwt_secret, config.token_ttl);
    let app = api::create_router(AppState::new(db, auth));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening, press Ctrl+C to shut down");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
