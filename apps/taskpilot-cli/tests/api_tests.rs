//! HTTP API tests driven through the router with `oneshot`

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use taskpilot_cli::{server, AppContext};
use taskpilot_core::cache::MemoryBackend;
use taskpilot_core::test_utils::CountingGenerator;
use taskpilot_core::{
    AuthConfig, CacheStore, ProviderError, ProviderKind, Repositories, TextGenerator,
};
use tower::ServiceExt;

async fn context(generator: Arc<CountingGenerator>) -> AppContext {
    let cache = CacheStore::connect(
        Arc::new(MemoryBackend::new(1_000)),
        "ai_cache",
        Duration::from_secs(3600),
    )
    .await;
    let auth = AuthConfig {
        jwt_secret: "api-test-secret".to_string(),
        pbkdf2_iterations: 1_000,
        ..AuthConfig::default()
    };
    let generator: Arc<dyn TextGenerator> = generator;
    AppContext::new(
        Repositories::in_memory(),
        Arc::new(cache),
        generator,
        ProviderKind::Offline,
        &auth,
    )
    .unwrap()
}

async fn app_with(generator: Arc<CountingGenerator>) -> Router {
    server::router(context(generator).await)
}

async fn app() -> Router {
    app_with(Arc::new(CountingGenerator::new("generated text"))).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "s3cure-pass" });
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users/register",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app, Method::POST, "/api/users/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

fn new_task(title: &str) -> Value {
    json!({
        "title": title,
        "description": "from the API",
        "due_date": "2030-01-15T09:00:00Z",
        "priority": "high",
        "tags": ["api"],
        "mini_tasks": { "draft": false }
    })
}

#[tokio::test]
async fn test_root_and_health_are_public() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "TaskPilot API");

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"]["backend"], "memory");
    assert_eq!(body["cache"]["connected"], true);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = app().await;

    for (method, uri) in [
        (Method::GET, "/api/tasks"),
        (Method::GET, "/api/agent/summary"),
        (Method::GET, "/api/agent/recommendations"),
        (Method::GET, "/api/agent/health"),
        (Method::GET, "/api/cache/stats"),
        (Method::DELETE, "/api/cache"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(body["detail"].is_string());
    }

    let (status, _) = send(&app, Method::GET, "/api/tasks", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rules() {
    let app = app().await;
    signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "username": "alice", "password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "username": "bo", "password": "long-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_crud() {
    let app = app().await;
    let token = signup(&app, "alice").await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(&token),
        Some(new_task("  Write release notes  ")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Write release notes");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_i64().unwrap();

    let (status, listed) = send(&app, Method::GET, "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let uri = format!("/api/tasks/{id}");
    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["title"], "Write release notes");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found");
}

#[tokio::test]
async fn test_task_validation_errors() {
    let app = app().await;
    let token = signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(&token),
        Some(new_task("   ")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(&token),
        Some(json!({ "title": "No due date" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tasks_are_private_to_their_owner() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(&alice),
        Some(new_task("Alice only")),
    )
    .await;
    let uri = format!("/api/tasks/{}", created["id"]);

    let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, Method::GET, "/api/tasks", Some(&bob), None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_agent_output_is_cached_until_tasks_change() {
    let generator = Arc::new(CountingGenerator::new("generated text"));
    let app = app_with(generator.clone()).await;
    let token = signup(&app, "alice").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(&token),
        Some(new_task("Plan sprint")),
    )
    .await;

    let (status, first) = send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["summary"], "generated text");
    assert_eq!(first["prompt_type"], "project_summary");
    assert_eq!(first["metadata"]["total_tasks"], 1);

    let (_, second) = send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    assert_eq!(second["summary"], first["summary"]);
    assert_eq!(generator.calls(), 1);

    let (status, recommendations) = send(
        &app,
        Method::GET,
        "/api/agent/recommendations",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recommendations["prompt_type"], "task_recommendations");
    assert_eq!(recommendations["metadata"]["high_priority_tasks"], 1);
    assert_eq!(generator.calls(), 2);

    let uri = format!("/api/tasks/{}", created["id"]);
    send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "completed": true })),
    )
    .await;
    send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_generation_failure_is_bad_gateway() {
    let generator = Arc::new(CountingGenerator::failing(ProviderError::RateLimited {
        message: "slow down".to_string(),
    }));
    let app = app_with(generator.clone()).await;
    let token = signup(&app, "alice").await;

    let (status, body) = send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body["detail"].as_str().unwrap().contains("slow down"));

    // Failures are not cached.
    send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_agent_health_reports_offline_provider() {
    let app = app().await;
    let token = signup(&app, "alice").await;

    let (status, body) = send(&app, Method::GET, "/api/agent/health", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "offline");
    assert_eq!(body["provider_configured"], false);
    assert_eq!(body["status"], "configuration_required");
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let app = app().await;
    let token = signup(&app, "alice").await;
    send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;
    send(&app, Method::GET, "/api/agent/summary", Some(&token), None).await;

    let (status, stats) = send(&app, Method::GET, "/api/cache/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["connected"], true);
    assert_eq!(stats["key_count"], 1);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);

    let (status, outcome) = send(&app, Method::DELETE, "/api/cache", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["removed"], 1);

    let (_, stats) = send(&app, Method::GET, "/api/cache/stats", Some(&token), None).await;
    assert_eq!(stats["key_count"], 0);
}
