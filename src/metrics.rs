// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the comment board.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters exposed on the metrics endpoint.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    comments_posted: IntCounter,
    rejections: IntCounterVec,
    rate_limit_decisions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("comment_board".to_string()), None)?;

        let comments_posted =
            IntCounter::new("comments_posted_total", "Comments accepted and stored")?;
        let rejections = IntCounterVec::new(
            Opts::new("comment_rejections_total", "Comment submissions rejected"),
            &["reason"],
        )?;
        let rate_limit_decisions = IntCounterVec::new(
            Opts::new("rate_limit_decisions_total", "Admission decisions by outcome"),
            &["decision"],
        )?;

        registry.register(Box::new(comments_posted.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(rate_limit_decisions.clone()))?;

        Ok(Self {
            registry,
            comments_posted,
            rejections,
            rate_limit_decisions,
        })
    }

    pub fn comment_posted(&self) {
        self.comments_posted.inc();
    }

    pub fn comment_rejected(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }

    pub fn admission(&self, allowed: bool) {
        let decision = if allowed { "allowed" } else { "denied" };
        self.rate_limit_decisions.with_label_values(&[decision]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
