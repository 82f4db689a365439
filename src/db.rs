// SPDX-License-Identifier: PMPL-1.0-or-later
//! SQLite storage for comments and per-IP rate-limit records

use crate::{
    error::{AppError, Result},
    models::{format_timestamp, parse_timestamp, Comment, NewComment, RateLimitRecord},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_comments_timestamp
        ON comments (timestamp DESC, id DESC);

    CREATE TABLE IF NOT EXISTS rate_limits (
        ip TEXT PRIMARY KEY,
        last_request TEXT NOT NULL
    );
"#;

/// Outcome of an attempt to claim the posting slot for an IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitClaim {
    /// The record was created or refreshed with the new time.
    Claimed,
    /// A record newer than the cutoff exists and was left alone.
    Held { last_request: DateTime<Utc> },
}

/// Database connection wrapper
///
/// All access goes through one connection behind a mutex, so every method is
/// atomic with respect to the others.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database at `path`, or an in-memory one for `"memory"`, and
    /// create the schema if needed.
    pub async fn connect(path: &str) -> Result<Self> {
        let conn = if path == "memory" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        debug!(path, "Database schema ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Internal("database lock poisoned".to_string()))?;
            f(&guard).map_err(AppError::from)
        })
        .await
        .map_err(|e| AppError::Internal(format!("database task failed: {}", e)))?
    }

    /// Insert a comment and return it with its assigned id.
    pub async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO comments (username, content, timestamp) VALUES (?1, ?2, ?3)",
                params![
                    comment.username,
                    comment.content,
                    format_timestamp(&comment.timestamp)
                ],
            )?;
            Ok(Comment {
                id: conn.last_insert_rowid(),
                username: comment.username,
                content: comment.content,
                timestamp: comment.timestamp,
            })
        })
        .await
    }

    /// Comments newest first; equal timestamps fall back to newest id first.
    pub async fn list_comments(&self, limit: u32, offset: u64) -> Result<Vec<Comment>> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, content, timestamp
                 FROM comments
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let comments = stmt
                .query_map(params![limit, offset], comment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(comments)
        })
        .await
    }

    /// Total number of stored comments.
    pub async fn count_comments(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Look up the rate-limit record for `ip`.
    pub async fn get_rate_limit(&self, ip: IpAddr) -> Result<Option<RateLimitRecord>> {
        self.with_conn(move |conn| {
            let last: Option<String> = conn
                .query_row(
                    "SELECT last_request FROM rate_limits WHERE ip = ?1",
                    params![ip.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            last.map(|s| -> rusqlite::Result<RateLimitRecord> {
                Ok(RateLimitRecord {
                    ip,
                    last_request: timestamp_column(0, &s)?,
                })
            })
            .transpose()
        })
        .await
    }

    /// Record `now` for `ip` unless a record newer than `cutoff` exists.
    ///
    /// The insert-or-update-if-expired is one SQL statement, and the follow-up
    /// read runs under the same lock, so concurrent claims for one IP cannot
    /// both succeed.
    pub async fn claim_rate_limit(
        &self,
        ip: IpAddr,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Result<RateLimitClaim> {
        self.with_conn(move |conn| {
            let ip = ip.to_string();
            let changed = conn.execute(
                "INSERT INTO rate_limits (ip, last_request) VALUES (?1, ?2)
                 ON CONFLICT(ip) DO UPDATE SET last_request = excluded.last_request
                 WHERE rate_limits.last_request <= ?3",
                params![ip, format_timestamp(&now), format_timestamp(&cutoff)],
            )?;
            if changed > 0 {
                return Ok(RateLimitClaim::Claimed);
            }

            let last: String = conn.query_row(
                "SELECT last_request FROM rate_limits WHERE ip = ?1",
                params![ip],
                |row| row.get(0),
            )?;
            Ok(RateLimitClaim::Held {
                last_request: timestamp_column(0, &last)?,
            })
        })
        .await
    }

    /// Delete rate-limit records last touched at or before `older_than`.
    pub async fn prune_rate_limits(&self, older_than: DateTime<Utc>) -> Result<usize> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM rate_limits WHERE last_request <= ?1",
                params![format_timestamp(&older_than)],
            )
        })
        .await
    }
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let timestamp: String = row.get(3)?;
    Ok(Comment {
        id: row.get(0)?,
        username: row.get(1)?,
        content: row.get(2)?,
        timestamp: timestamp_column(3, &timestamp)?,
    })
}

fn timestamp_column(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
