// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ready-made services and state over an in-memory database.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{DateTime, TimeZone, Utc};
use comment_board::{
    config::{Config, PaginationConfig, RateLimitConfig},
    db::Database,
    handlers::AppState,
    AdminIdentity, CommentService, RateLimiter,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Fixed reference time for deterministic tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
}

/// Argon2id hash with minimal cost parameters.
pub fn cheap_hash(password: &str) -> String {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let salt = SaltString::encode_b64(b"harness-salt-0001").unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn admin() -> AdminIdentity {
    AdminIdentity::new(ADMIN_USERNAME, &cheap_hash(ADMIN_PASSWORD)).unwrap()
}

/// Limiter and service sharing one in-memory database.
pub async fn board() -> (RateLimiter, CommentService) {
    let db = Database::connect("memory").await.unwrap();
    let limiter = RateLimiter::new(RateLimitConfig::default(), db.clone());
    let service = CommentService::new(db, admin(), PaginationConfig::default());
    (limiter, service)
}

/// Application state with the given config over an in-memory database.
pub async fn state_with(config: Config) -> Arc<AppState> {
    let db = Database::connect("memory").await.unwrap();
    state_over(config, db)
}

/// Application state over an already opened database.
pub fn state_over(config: Config, db: Database) -> Arc<AppState> {
    Arc::new(AppState::new(config, db, admin()).unwrap())
}

/// Unique database file path under the system temp dir.
pub fn temp_db_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "comment-board-{}-{}-{}.db",
        tag,
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

pub async fn state() -> Arc<AppState> {
    state_with(Config::default()).await
}
