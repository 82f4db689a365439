// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-IP daily posting limiter.
//!
//! Each client IP gets one accepted submission per rolling window (one day by
//! default). The quota is spent when a request is admitted, whatever happens
//! to the request afterwards.

use crate::config::RateLimitConfig;
use crate::db::{Database, RateLimitClaim};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed; the window for this IP starts now.
    Allowed,
    /// Request is rate limited
    Denied {
        /// Time until the current window for this IP ends
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Store-backed rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    db: Database,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig, db: Database) -> Self {
        Self { config, db }
    }

    fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.window_duration())
            .unwrap_or_else(|_| chrono::Duration::days(1))
    }

    /// Admit or deny a submission from `ip` at `now`.
    ///
    /// Allowed when the IP has no record or its last accepted submission is at
    /// least one window old; the record is then set to `now`. Denied
    /// otherwise, leaving the record untouched.
    pub async fn admit(&self, ip: IpAddr, now: DateTime<Utc>) -> Result<Admission> {
        let window = self.window();
        let cutoff = now - window;

        match self.db.claim_rate_limit(ip, now, cutoff).await? {
            RateLimitClaim::Claimed => {
                debug!(%ip, "Submission admitted");
                Ok(Admission::Allowed)
            }
            RateLimitClaim::Held { last_request } => {
                let retry_after = (last_request + window - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                info!(
                    %ip,
                    retry_after_secs = retry_after.as_secs(),
                    "Daily comment quota already used"
                );
                Ok(Admission::Denied { retry_after })
            }
        }
    }

    /// Delete records older than the configured retention period. Does
    /// nothing unless retention is enabled.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(retention) = self.config.retention_duration() else {
            return Ok(0);
        };
        let retention = chrono::Duration::from_std(retention).unwrap_or(self.window());

        let removed = self.db.prune_rate_limits(now - retention).await?;
        if removed > 0 {
            debug!(removed, "Pruned expired rate-limit records");
        }
        Ok(removed)
    }
}
