// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment Board
//!
//! A minimal public comment board backed by SQLite:
//!
//! - One accepted comment per client IP per day
//! - Markup stripped from usernames and comment bodies
//! - Length limits (username 1-25, comment 1-100 characters)
//! - Reserved admin username, usable only with the admin password
//! - Paginated listing, newest first

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod models;
pub mod sanitizer;
pub mod service;
pub mod validator;

pub use admin::AdminIdentity;
pub use config::Config;
pub use db::Database;
pub use error::AppError;
pub use limiter::{Admission, RateLimiter};
pub use service::CommentService;
