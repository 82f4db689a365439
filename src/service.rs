// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment creation and listing.
//!
//! Posting runs sanitize → reserved-username check → content length →
//! username length → insert, stopping at the first failure. The caller is
//! expected to have admitted the request through
//! [`RateLimiter::admit`](crate::limiter::RateLimiter::admit) first.

use crate::admin::AdminIdentity;
use crate::config::PaginationConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{truncate_to_millis, Comment, CommentPage, NewComment, PostComment};
use crate::sanitizer::sanitize_opt;
use crate::validator::{validate_content, validate_username};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Validates and stores comments.
#[derive(Clone)]
pub struct CommentService {
    db: Database,
    admin: Arc<AdminIdentity>,
    pagination: PaginationConfig,
}

impl CommentService {
    pub fn new(db: Database, admin: AdminIdentity, pagination: PaginationConfig) -> Self {
        Self {
            db,
            admin: Arc::new(admin),
            pagination,
        }
    }

    /// Sanitize, check and store a comment posted at `now`.
    pub async fn post_comment(&self, request: PostComment, now: DateTime<Utc>) -> Result<Comment> {
        let username = sanitize_opt(request.username.as_ref());
        let content = sanitize_opt(request.content.as_ref());

        if self.admin.is_reserved(&username) {
            let authorized = match request.password() {
                Some(password) => self.verify_admin_password(password).await?,
                None => false,
            };
            if !authorized {
                warn!("Reserved username used without valid password");
                return Err(AppError::ReservedUsername);
            }
            debug!("Reserved username authorized");
        }

        validate_content(&content)?;
        validate_username(&username)?;

        let comment = self
            .db
            .create_comment(NewComment {
                username,
                content,
                timestamp: truncate_to_millis(now),
            })
            .await?;

        info!(id = comment.id, username = %comment.username, "Comment added");
        Ok(comment)
    }

    /// Hash verification is CPU-bound, so it runs on the blocking pool.
    async fn verify_admin_password(&self, password: &str) -> Result<bool> {
        let admin = Arc::clone(&self.admin);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || admin.verify_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password check failed: {}", e)))
    }

    /// One page of comments, newest first.
    ///
    /// `page` and `limit` fall back to 1 and the configured default when
    /// missing or below 1; `limit` is capped at the configured maximum.
    pub async fn list_comments(&self, page: Option<i64>, limit: Option<i64>) -> Result<CommentPage> {
        let page = page.filter(|p| *p >= 1).unwrap_or(1) as u64;
        let limit = limit
            .filter(|l| *l >= 1)
            .map(|l| l.min(i64::from(self.pagination.max_limit)) as u32)
            .unwrap_or(self.pagination.default_limit)
            .clamp(1, self.pagination.max_limit.max(1));

        let offset = (page - 1).saturating_mul(u64::from(limit));
        let comments = self.db.list_comments(limit, offset).await?;
        let total = self.db.count_comments().await?;

        Ok(CommentPage {
            comments,
            total_pages: total.div_ceil(u64::from(limit)),
        })
    }
}
