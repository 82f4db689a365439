// SPDX-License-Identifier: PMPL-1.0-or-later
//! Data models for comments and rate-limit records

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::net::IpAddr;

/// A stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub username: String,
    pub content: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// A comment that passed sanitization and validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Last accepted submission for one client IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub ip: IpAddr,
    pub last_request: DateTime<Utc>,
}

/// One page of comments, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub total_pages: u64,
}

/// Raw body of `POST /comments`.
///
/// Fields stay as JSON values so that non-string input can be sanitized to
/// an empty string instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostComment {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

impl PostComment {
    /// Convenience constructor for plain string fields.
    pub fn new(username: &str, content: &str, password: Option<&str>) -> Self {
        Self {
            username: Some(Value::from(username)),
            content: Some(Value::from(content)),
            password: password.map(Value::from),
        }
    }

    /// The password, if one was sent as a non-empty string.
    pub fn password(&self) -> Option<&str> {
        match &self.password {
            Some(Value::String(p)) if !p.is_empty() => Some(p),
            _ => None,
        }
    }
}

/// Response body for a successful `POST /comments`.
#[derive(Debug, Serialize)]
pub struct PostCommentResponse {
    pub message: &'static str,
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2026-10-17T08:30:00.123Z`.
///
/// Fixed width, so stored timestamps sort lexically in time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Drop sub-millisecond precision so a value survives a store round trip.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}
