// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for the comment board

use crate::validator::ValidationError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unauthorized use of reserved username!")]
    ReservedUsername,

    #[error("you can only post one comment per day!")]
    RateLimited { retry_after: Duration },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ReservedUsername => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::ReservedUsername => "RESERVED_USERNAME",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        match self {
            Self::Database(_) | Self::Internal(_) => {
                error!(error = %self, "Request failed");
                (
                    status,
                    Json(ErrorResponse {
                        error: "internal server error".to_string(),
                        code,
                        retry_after_secs: None,
                    }),
                )
                    .into_response()
            }
            Self::RateLimited { retry_after } => {
                let retry_secs = retry_after.as_secs();
                (
                    status,
                    [(header::RETRY_AFTER, retry_secs.to_string())],
                    Json(ErrorResponse {
                        error: self.to_string(),
                        code,
                        retry_after_secs: Some(retry_secs),
                    }),
                )
                    .into_response()
            }
            _ => (
                status,
                Json(ErrorResponse {
                    error: self.to_string(),
                    code,
                    retry_after_secs: None,
                }),
            )
                .into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
