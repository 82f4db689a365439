// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment Board Service
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and a `.env` file if
//! present):
//!
//! - `SERVER_USERNAME`: reserved admin username (required)
//! - `SERVER_PASSWORD_HASH`: Argon2 or bcrypt hash of the admin password (required)
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8100)
//! - `DATABASE_PATH`: SQLite file (default: comments.db)
//! - `ALLOWED_ORIGINS`: comma-separated CORS allow-list (default: https://lain.ovh)
//! - `TRUST_PROXY`: take the client IP from `X-Forwarded-For` (default: true)
//! - `RATE_LIMIT_WINDOW_SECS`: posting window per IP (default: 86400)
//! - `RATE_LIMIT_RETENTION_SECS`: prune rate-limit records older than this (default: never)
//! - `MAX_PAGE_SIZE`: largest accepted `limit` (default: 100)
//! - `METRICS_ENABLED`: expose `/metrics` (default: true)
//!
//! `comment-board hash-password` reads a password from stdin and prints an
//! Argon2id hash suitable for `SERVER_PASSWORD_HASH`.

use anyhow::Context;
use axum::Router;
use chrono::Utc;
use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comment_board::{
    admin::{hash_password, AdminIdentity},
    config::Config,
    db::Database,
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("hash-password") {
        return print_password_hash();
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let admin = AdminIdentity::from_env().context("admin identity is required")?;
    info!(
        bind_addr = %config.bind_addr,
        database = %config.database_path,
        window_secs = config.rate_limit.window_secs,
        retention_secs = ?config.rate_limit.retention_secs,
        allowed_origins = ?config.allowed_origins,
        trust_proxy = config.trust_proxy,
        admin = %admin.username(),
        "Starting comment board"
    );

    let db = Database::connect(&config.database_path)
        .await
        .with_context(|| format!("opening database {}", config.database_path))?;

    let state = Arc::new(AppState::new(config.clone(), db, admin)?);

    // Spawn cleanup task
    if config.rate_limit.retention_secs.is_some() {
        let cleanup_state = state.clone();
        let period = config.rate_limit.cleanup_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = cleanup_state.limiter.cleanup(Utc::now()).await {
                    warn!(error = %e, "Rate-limit cleanup failed");
                }
            }
        });
    }

    // Build router
    let app: Router = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Read one line from stdin and print its Argon2id hash.
fn print_password_hash() -> anyhow::Result<()> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    anyhow::ensure!(!password.is_empty(), "empty password");
    println!("{}", hash_password(password)?);
    Ok(())
}
