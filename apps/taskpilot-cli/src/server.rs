//! HTTP API
//!
//! Task, agent, and cache routes require `Authorization: Bearer <token>`
//! obtained from `POST /api/users/login`. Errors are returned as
//! `{"detail": "..."}` with a status derived from [`TaskPilotError`].

use crate::context::AppContext;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use taskpilot_core::{
    AgentHealth, AgentRecommendations, AgentSummary, CacheStats, ClearOutcome, CreateTaskRequest,
    Credentials, Task, TaskPilotError, TokenResponse, UpdateTaskRequest, User,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

pub type AppState = Arc<AppContext>;

/// Error body plus status for a failed request
#[derive(Debug)]
pub struct ApiError(pub TaskPilotError);

impl From<TaskPilotError> for ApiError {
    fn from(err: TaskPilotError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TaskPilotError::Validation { .. } => StatusCode::BAD_REQUEST,
            TaskPilotError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            TaskPilotError::TaskNotFound { .. } => StatusCode::NOT_FOUND,
            TaskPilotError::Conflict { .. } => StatusCode::CONFLICT,
            TaskPilotError::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match &self.0 {
            TaskPilotError::Validation { message }
            | TaskPilotError::Unauthorized { message }
            | TaskPilotError::Conflict { message } => message.clone(),
            TaskPilotError::TaskNotFound { .. } => "Task not found".to_string(),
            TaskPilotError::Provider(_) => "AI generation failed, please try again later".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::BAD_GATEWAY => warn!(error = %self.0, "Upstream generation failed"),
            StatusCode::INTERNAL_SERVER_ERROR => error!(error = %self.0, "Request failed"),
            _ => {}
        }

        let mut response = (status, Json(json!({ "detail": self.detail() }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// The caller resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| TaskPilotError::unauthorized("Could not validate credentials"))?;
        let user = state.users.authenticate(token).await?;
        Ok(Self(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Build the API router over `ctx`
pub fn router(ctx: AppContext) -> Router {
    let api = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/agent/summary", get(agent_summary))
        .route("/agent/recommendations", get(agent_recommendations))
        .route("/agent/health", get(agent_health))
        .route("/cache/stats", get(cache_stats))
        .route("/cache", delete(clear_cache));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(taskpilot_common::API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(ctx))
}

/// Serve the API on `address` until Ctrl-C
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails
#[instrument(skip(ctx))]
pub async fn serve(ctx: AppContext, address: &str) -> std::io::Result<()> {
    let app = router(ctx);

    #[cfg(feature = "observability")]
    let app = match crate::metrics::install_recorder() {
        Ok(handle) => app.merge(crate::metrics::routes(handle)),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed; /metrics disabled");
            app
        }
    };

    let listener = TcpListener::bind(address).await?;
    info!(address = %address, "TaskPilot API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("{} API", taskpilot_common::APP_NAME),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": taskpilot_common::APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "backend": state.cache.backend_name(),
            "connected": state.cache.is_connected(),
        },
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.register(credentials).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
    Ok(Json(state.users.login(credentials).await?))
}

async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.tasks.list(user.id).await?))
}

async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.tasks.create(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.tasks.get(user.id, id).await?))
}

async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.tasks.update(user.id, id, request).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn agent_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<AgentSummary>, ApiError> {
    Ok(Json(state.agent.summary(user.id).await?))
}

async fn agent_recommendations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<AgentRecommendations>, ApiError> {
    Ok(Json(state.agent.recommendations(user.id).await?))
}

async fn agent_health(State(state): State<AppState>, AuthUser(_): AuthUser) -> Json<AgentHealth> {
    Json(state.agent.health())
}

async fn cache_stats(State(state): State<AppState>, AuthUser(_): AuthUser) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

async fn clear_cache(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<ClearOutcome> {
    let outcome = state.cache.clear_namespace().await;
    info!(
        user_id = user.id,
        removed = outcome.removed,
        success = outcome.success,
        "Cache cleared"
    );
    Json(outcome)
}
