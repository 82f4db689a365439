// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP-level tests driving the router directly.

mod harness;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use comment_board::{config::Config, handlers::router};
use comment_board::db::Database;
use harness::fixtures::{state, state_over, state_with, temp_db_path, ADMIN_PASSWORD};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower::ServiceExt;

fn peer(ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(format!("{}:40000", ip).parse().unwrap())
}

async fn app() -> Router {
    router(state().await)
}

async fn send(app: &Router, mut request: Request<Body>, ip: &str) -> Response {
    request.extensions_mut().insert(peer(ip));
    app.clone().oneshot(request).await.unwrap()
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/comments")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let app = app().await;

    let response = send(&app, post_json(json!({"username": "alice", "content": "hello"})), "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await, json!({"message": "comment added!"}));

    let response = send(&app, post_json(json!({"username": "alice", "content": "again"})), "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = json_body(response).await;
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(body["error"], "you can only post one comment per day!");

    let response = send(
        &app,
        post_json(json!({"username": "Admin", "content": "hi", "password": "wrong"})),
        "203.0.113.2",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["error"],
        "unauthorized use of reserved username!"
    );

    let response = send(
        &app,
        post_json(json!({"username": "bob", "content": "x".repeat(101)})),
        "203.0.113.3",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "comment must be between 1 and 100 characters!"
    );

    let response = send(&app, get("/comments"), "203.0.113.4").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(body["comments"][0]["username"], "alice");
    assert!(body["comments"][0]["id"].is_i64());
    assert!(body["comments"][0]["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_failed_post_still_consumes_quota() {
    let app = app().await;

    let response = send(&app, post_json(json!({"username": "", "content": "hi"})), "198.51.100.7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "username must be between 1 and 25 characters!"
    );

    let response = send(&app, post_json(json!({"username": "ok", "content": "hi"})), "198.51.100.7").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admin_with_password_is_accepted() {
    let app = app().await;

    let response = send(
        &app,
        post_json(json!({"username": "ADMIN", "content": "announcement", "password": ADMIN_PASSWORD})),
        "198.51.100.8",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_non_string_fields() {
    let app = app().await;

    let response = send(&app, post_json(json!({"username": 42, "content": {"a": 1}})), "198.51.100.9").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_listing_pagination_query() {
    let app = app().await;

    for i in 0..8 {
        let ip = format!("192.0.2.{}", i + 1);
        let response = send(
            &app,
            post_json(json!({"username": "poster", "content": format!("c{}", i)})),
            &ip,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let first = json_body(send(&app, get("/comments?page=1&limit=5"), "192.0.2.100").await).await;
    let second = json_body(send(&app, get("/comments?page=2&limit=5"), "192.0.2.100").await).await;
    assert_eq!(first["totalPages"], 2);
    assert_eq!(first["comments"].as_array().unwrap().len(), 5);
    assert_eq!(second["comments"].as_array().unwrap().len(), 3);

    let mut ids: Vec<i64> = first["comments"]
        .as_array()
        .unwrap()
        .iter()
        .chain(second["comments"].as_array().unwrap())
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    let listed = ids.clone();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();
    assert_eq!(listed, ids, "pages must be newest first with no overlap");
    assert_eq!(listed.len(), 8);

    // Garbage query values fall back to defaults
    let response = send(&app, get("/comments?page=abc&limit=0"), "192.0.2.100").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["comments"].as_array().unwrap().len(), 5);
    assert_eq!(body["totalPages"], 2);
}

#[tokio::test]
async fn test_repeated_query_keys_take_first_value() {
    let app = app().await;

    for i in 0..3 {
        let ip = format!("192.0.2.{}", 150 + i);
        send(&app, post_json(json!({"username": "dup", "content": format!("d{}", i)})), &ip).await;
    }

    let response = send(&app, get("/comments?page=1&page=2&limit=2&limit=50"), "192.0.2.149").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["comments"].as_array().unwrap().len(), 2);
    assert_eq!(body["comments"][0]["content"], "d2");
}

#[tokio::test]
async fn test_store_failure_is_opaque_500() {
    let path = temp_db_path("store-failure");
    let path_str = path.to_string_lossy().to_string();
    let db = Database::connect(&path_str).await.unwrap();
    let app = router(state_over(Config::default(), db));

    // Break the schema underneath the running service
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("DROP TABLE comments; DROP TABLE rate_limits;")
            .unwrap();
    }

    let expected = json!({"error": "internal server error", "code": "INTERNAL_ERROR"});

    let response = send(&app, post_json(json!({"username": "x", "content": "y"})), "198.51.100.70").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, expected);

    let response = send(&app, get("/comments"), "198.51.100.70").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, expected);

    // Nothing was written behind the failure
    let conn = rusqlite::Connection::open(&path).unwrap();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('comments', 'rate_limits')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 0);

    drop(conn);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_forwarded_for_used_when_proxy_trusted() {
    let app = app().await;

    let request = |ip: &str| {
        let mut req = post_json(json!({"username": "proxied", "content": "hi"}));
        req.headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        req
    };

    // Same proxy peer, different forwarded clients
    assert_eq!(send(&app, request("203.0.113.50"), "10.0.0.1").await.status(), StatusCode::CREATED);
    assert_eq!(send(&app, request("203.0.113.51"), "10.0.0.1").await.status(), StatusCode::CREATED);
    assert_eq!(
        send(&app, request("203.0.113.50"), "10.0.0.1").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_forwarded_for_ignored_without_proxy_trust() {
    let config = Config {
        trust_proxy: false,
        ..Default::default()
    };
    let app = router(state_with(config).await);

    let request = |ip: &str| {
        let mut req = post_json(json!({"username": "direct", "content": "hi"}));
        req.headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        req
    };

    assert_eq!(send(&app, request("203.0.113.60"), "10.0.0.2").await.status(), StatusCode::CREATED);
    // Spoofed header does not buy a fresh quota
    assert_eq!(
        send(&app, request("203.0.113.61"), "10.0.0.2").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_origin_allow_list() {
    let app = app().await;

    let with_origin = |origin: &str| {
        Request::builder()
            .uri("/comments")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let response = send(&app, with_origin("https://lain.ovh"), "192.0.2.200").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://lain.ovh"
    );

    let response = send(&app, with_origin("https://evil.example"), "192.0.2.200").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "ORIGIN_NOT_ALLOWED");

    // No Origin header at all
    let response = send(&app, get("/comments"), "192.0.2.200").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disallowed_origin_does_not_consume_quota() {
    let app = app().await;

    let mut request = post_json(json!({"username": "x", "content": "y"}));
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());
    assert_eq!(send(&app, request, "192.0.2.201").await.status(), StatusCode::FORBIDDEN);

    let response = send(&app, post_json(json!({"username": "x", "content": "y"})), "192.0.2.201").await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = app().await;

    let response = send(&app, get("/health"), "192.0.2.250").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");

    send(&app, post_json(json!({"username": "m", "content": "n"})), "192.0.2.251").await;
    send(&app, post_json(json!({"username": "m", "content": "n"})), "192.0.2.251").await;

    let response = send(&app, get("/metrics"), "192.0.2.250").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("comment_board_comments_posted_total 1"));
    assert!(text.contains("comment_board_rate_limit_decisions_total{decision=\"denied\"} 1"));
}

#[tokio::test]
async fn test_metrics_route_can_be_disabled() {
    let mut config = Config::default();
    config.metrics.enabled = false;
    let app = router(state_with(config).await);

    let response = send(&app, get("/metrics"), "192.0.2.252").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
