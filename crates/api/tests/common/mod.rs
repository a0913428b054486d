#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use quicklab_api::config::ServerConfig;
use quicklab_api::router::build_app_router;
use quicklab_api::state::AppState;
use quicklab_gitlab::{GitLabApi, Provisioner};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

/// Nothing listens here; provisioning against it fails at the transport.
pub const UNREACHABLE_GITLAB: &str = "http://127.0.0.1:9";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(gitlab_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        gitlab_url: gitlab_url.to_string(),
        gitlab_token: "glpat-test".to_string(),
        gitlab_reset_password: false,
        provision_max_attempts: 3,
        provision_initial_delay_ms: 1,
        provision_max_delay_ms: 5,
        ta_mail_domain: "uni.example".to_string(),
    }
}

/// Build the full application router against `pool` and the GitLab
/// instance at `gitlab_url`.
pub fn build_test_app_with_gitlab(pool: SqlitePool, gitlab_url: &str) -> Router {
    let config = test_config(gitlab_url);
    let gitlab = GitLabApi::new(&config.gitlab_url, config.gitlab_token.clone())
        .unwrap()
        .with_reset_password(false);
    let provisioner = Provisioner::new(Arc::new(gitlab), config.retry_policy());
    build_app_router(AppState::new(pool, provisioner, config.clone()), &config)
}

pub fn build_test_app(pool: SqlitePool) -> Router {
    build_test_app_with_gitlab(pool, UNREACHABLE_GITLAB)
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// CS101 with edition 2024 holding group g1 and its TA.
pub fn course_json() -> Value {
    serde_json::json!({
        "type": "group",
        "id": "CS101",
        "subtype": "course",
        "name": "Introduction to Programming",
        "children": [{
            "type": "group",
            "id": "2024",
            "subtype": "edition",
            "children": [{
                "type": "group",
                "id": "g1",
                "subtype": "group",
                "children": [{
                    "type": "user",
                    "id": "alice",
                    "username": "alice",
                    "name": "Alice",
                    "email": "alice@example.org",
                    "subtype": "ta"
                }]
            }]
        }]
    })
}
