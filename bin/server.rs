// CarVault - Web Server
// Login/logout plus session-protected pages, Axum over SQLite

use anyhow::{Context, Result};
use carvault::{
    logging, router, setup_database, AppState, PasswordHasher, ServerArgs, ServerConfig,
    SessionKeys,
};
use clap::Parser;
use rusqlite::Connection;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Missing secret, bad cost or bad log filter stop the process here
    let config = ServerConfig::from_args(ServerArgs::parse())?;
    logging::init(&config.log_level, config.log_format)?;
    debug!(config = ?config, "Configuration loaded");

    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(&config.database)
        .with_context(|| format!("Failed to connect to DB {}", config.database.display()))?;
    setup_database(&conn).context("Failed to initialize database")?;
    info!(path = %config.database.display(), "Database opened");

    let keys = SessionKeys::new(&config.session_secret)?;
    let passwords = PasswordHasher::new(config.bcrypt_cost)?;
    let state = AppState::new(conn, keys, passwords).with_secure_cookies(config.secure_cookies);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    info!(address = %config.addr, "Starting server...");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
