// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the comment board.

use crate::admin::AdminIdentity;
use crate::config::{normalize_origin, Config};
use crate::db::Database;
use crate::error::{AppError, ErrorResponse};
use crate::limiter::{Admission, RateLimiter};
use crate::metrics::Metrics;
use crate::models::{CommentPage, PostComment, PostCommentResponse};
use crate::service::CommentService;
use axum::{
    extract::{ConnectInfo, RawQuery, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub comments: CommentService,
    pub metrics: Metrics,
    pub config: Config,
    allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(config: Config, db: Database, admin: AdminIdentity) -> prometheus::Result<Self> {
        Ok(Self {
            limiter: RateLimiter::new(config.rate_limit.clone(), db.clone()),
            comments: CommentService::new(db, admin, config.pagination.clone()),
            metrics: Metrics::new()?,
            allowed_origins: config.normalized_origins(),
            config,
        })
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        normalize_origin(origin)
            .map(|o| self.allowed_origins.contains(&o))
            .unwrap_or(false)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Query string of `GET /comments`. Values are parsed leniently.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    /// Parse a raw query string. Unknown keys are ignored and the first
    /// occurrence of a repeated key wins.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match &*key {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/comments", get(list_comments).post(post_comment))
        .route("/health", get(health))
        .route("/healthz", get(health));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "comment-board",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /comments`
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<CommentPage>, AppError> {
    let query = ListQuery::parse(raw.as_deref());
    let page = query.page.as_deref().and_then(parse_int);
    let limit = query.limit.as_deref().and_then(parse_int);

    let result = state.comments.list_comments(page, limit).await?;
    Ok(Json(result))
}

/// `POST /comments`
///
/// The rate limiter runs first; its decision stands even if the comment is
/// then rejected.
pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<PostComment>,
) -> Result<(StatusCode, Json<PostCommentResponse>), AppError> {
    let ip = client_ip(&headers, peer, state.config.trust_proxy);
    let now = Utc::now();

    let admission = state.limiter.admit(ip, now).await?;
    state.metrics.admission(admission.is_allowed());
    if let Admission::Denied { retry_after } = admission {
        state.metrics.comment_rejected("rate_limited");
        return Err(AppError::RateLimited { retry_after });
    }

    match state.comments.post_comment(body, now).await {
        Ok(_) => {
            state.metrics.comment_posted();
            Ok((
                StatusCode::CREATED,
                Json(PostCommentResponse {
                    message: "comment added!",
                }),
            ))
        }
        Err(err) => {
            debug!(%ip, code = err.code(), "Comment rejected");
            state.metrics.comment_rejected(rejection_reason(&err));
            Err(err)
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(e.to_string()).into_response(),
    }
}

/// Refuse browser requests from origins outside the allow-list. Requests
/// without an `Origin` header pass.
pub async fn origin_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match origin {
        Some(origin) if !state.origin_allowed(&origin) => {
            warn!(origin = %origin, "Origin not allowed");
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: "not allowed by CORS!".to_string(),
                    code: "ORIGIN_NOT_ALLOWED",
                    retry_after_secs: None,
                }),
            )
                .into_response()
        }
        _ => next.run(request).await,
    }
}

/// Resolve the client IP. With `trust_proxy` the left-most valid
/// `X-Forwarded-For` entry wins, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_proxy: bool) -> IpAddr {
    let forwarded = if trust_proxy {
        forwarded_ip(headers)
    } else {
        None
    };
    forwarded.unwrap_or_else(|| peer.ip()).to_canonical()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').find_map(|part| part.trim().parse().ok()))
        .or_else(|| header_str(headers, "x-real-ip").and_then(|v| v.trim().parse().ok()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Leading integer of a query value, like `12` in `"12abc"`.
fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

fn rejection_reason(err: &AppError) -> &'static str {
    match err {
        AppError::Validation(_) => "validation",
        AppError::ReservedUsername => "reserved_username",
        AppError::RateLimited { .. } => "rate_limited",
        AppError::Database(_) | AppError::Internal(_) => "internal",
    }
}
