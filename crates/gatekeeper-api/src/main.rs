//! Gatekeeper API Server
//!
//! Configuration comes from the TOML file named by `GATEKEEPER_CONFIG` (if
//! set) with environment variables layered on top.

use anyhow::Context;
use gatekeeper_api::{auth::Argon2Hasher, create_router, state::AppState};
use gatekeeper_core::{
    AppConfig, InMemoryUserRepository, LoggingConfig, PgUserRepository, UserRepository,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_config()?;

    init_tracing(&config.logging);

    config.validate().context("invalid configuration")?;

    let users = connect_store(&config).await?;
    let hasher = Arc::new(Argon2Hasher::default());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.auth.environment;

    // Create application state
    let state = Arc::new(AppState::new(config, users, hasher));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(environment = %environment, "Gatekeeper API starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("GATEKEEPER_CONFIG") {
        Ok(path) if !path.is_empty() => AppConfig::from_file(&path)
            .with_context(|| format!("failed to load config file {path}"))?
            .with_env_override()?,
        _ => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gatekeeper_api={level},gatekeeper_core={level},audit=info,tower_http=debug",
            level = logging.level
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn UserRepository>> {
    match &config.database.url {
        Some(url) => {
            let repo = PgUserRepository::connect(url, config.database.pool_size)
                .await
                .context("failed to connect to PostgreSQL")?;
            repo.migrate().await.context("failed to run migrations")?;
            tracing::info!(pool_size = config.database.pool_size, "using PostgreSQL user store");
            Ok(Arc::new(repo))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory and lost on restart");
            Ok(Arc::new(InMemoryUserRepository::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
