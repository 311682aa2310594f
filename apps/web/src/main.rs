//! # Tally Web Server
//!
//! ```text
//! env ─► WebConfig ─► Database (migrations) ─► bootstrap admin ─► axum::serve
//! ```

use anyhow::Context;
use tally_db::{Database, DbConfig, NewUser};
use tally_web::{build_router, AppState, WebConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Tally web server...");

    let config = WebConfig::load().context("invalid configuration")?;
    if config.uses_dev_secret() {
        warn!("TALLY_JWT_SECRET is not set; using the development secret");
    }
    info!(
        addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.db_path).max_connections(config.db_max_connections))
        .await
        .context("failed to open database")?;

    bootstrap_admin(&db, &config).await?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    let app = build_router(AppState::new(db.clone(), config));

    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Creates the configured admin account when no user exists yet.
async fn bootstrap_admin(db: &Database, config: &WebConfig) -> anyhow::Result<()> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(());
    };

    if db.users().count().await? > 0 {
        return Ok(());
    }

    let user = db
        .users()
        .create(&NewUser {
            username: admin.username.clone(),
            password: admin.password.clone(),
            is_staff: true,
            is_admin: true,
        })
        .await
        .context("failed to create bootstrap admin")?;

    info!(username = %user.username, "Bootstrap admin created");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
