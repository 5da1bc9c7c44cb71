use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pioneer_db::repositories::RevokedTokenRepo;
use pioneer_db::DbPool;
use pioneer_events::{EventBus, EventLogger};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pioneer_api::config::ServerConfig;
use pioneer_api::router::build_app_router;
use pioneer_api::state::AppState;

/// How often expired entries are removed from the token blacklist.
const REVOKED_TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pioneer_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = pioneer_db::create_pool(&config.database_url, &config.pool_settings())
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    pioneer_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    pioneer_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Event bus and background tasks ---
    let event_bus = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();

    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe(), cancel.clone()));
    let purge_handle = tokio::spawn(purge_revoked_tokens(pool.clone(), cancel.clone()));
    tracing::info!("Background tasks started (event logger, token purge)");

    // --- App state and router ---
    let state = AppState::new(pool, config.clone(), Arc::clone(&event_bus));
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, purge_handle).await.is_err() {
        tracing::warn!("Token purge task did not stop in time");
    }
    if tokio::time::timeout(grace, logger_handle).await.is_err() {
        tracing::warn!("Event logger did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Periodically drop blacklist entries whose tokens have expired anyway.
async fn purge_revoked_tokens(pool: DbPool, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(REVOKED_TOKEN_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => match RevokedTokenRepo::purge_expired(&pool).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired revoked tokens"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge revoked tokens"),
            },
        }
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
