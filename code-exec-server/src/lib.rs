mod pipeline;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use code_exec::{Entitlement, ExecutionStatus};
use exec_store::{
    CallerIdentity, Cursor, EntitlementStore, ExecutionId, ExecutionRecord, ExecutionStore, Page,
    PageRequest, StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use usage_stats::{StatsAggregator, StatsError, UsageStats};

pub use pipeline::{PipelineError, RunPipeline, RunReceipt};

/// Header carrying the user id issued by the identity provider
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Entitlement required for language: {0}")]
    EntitlementDenied(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(StoreError),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unauthenticated => ServerError::Unauthenticated,
            StoreError::EntitlementDenied { language } => ServerError::EntitlementDenied(language),
            StoreError::InvalidCursor(cursor) => {
                ServerError::InvalidRequest(format!("invalid cursor: {}", cursor))
            }
            StoreError::UserNotFound(user_id) => ServerError::NotFound(user_id),
            other => ServerError::Storage(other),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Unauthenticated => ServerError::Unauthenticated,
            PipelineError::EntitlementDenied { language } => {
                ServerError::EntitlementDenied(language)
            }
            PipelineError::Storage(e) => e.into(),
        }
    }
}

impl From<StatsError> for ServerError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::EntitlementDenied(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Storage(_) | ServerError::ServerError(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Caller identity from [`USER_HEADER`], absent when the header is missing
pub struct Caller(pub Option<CallerIdentity>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
            .map(CallerIdentity::new);
        Ok(Caller(identity))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub status: ExecutionStatus,
    pub output: String,
    pub error: Option<String>,
    pub execution_id: Option<ExecutionId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RunPipeline>,
    executions: Arc<dyn ExecutionStore>,
    entitlements: Arc<dyn EntitlementStore>,
    stats: Arc<StatsAggregator>,
}

impl AppState {
    pub fn new(
        pipeline: RunPipeline,
        executions: Arc<dyn ExecutionStore>,
        entitlements: Arc<dyn EntitlementStore>,
        stats: StatsAggregator,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            executions,
            entitlements,
            stats: Arc::new(stats),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_check))
        .route("/executions", post(execute))
        .route("/users/{user_id}/executions", get(list_executions))
        .route("/users/{user_id}/stats", get(user_stats))
        .route("/users/{user_id}/entitlement", get(user_entitlement))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting code execution server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn execute(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ServerError> {
    let receipt = state
        .pipeline
        .submit(identity.as_ref(), &payload.language, &payload.code)
        .await?;

    Ok(Json(ExecuteResponse {
        status: receipt.outcome.status,
        output: receipt.outcome.output,
        error: receipt.outcome.error,
        execution_id: receipt.execution_id,
    }))
}

async fn list_executions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<ExecutionRecord>>, ServerError> {
    let cursor = query.cursor.as_deref().map(Cursor::decode).transpose()?;
    let page = state
        .executions
        .list_by_user(
            &user_id,
            PageRequest {
                cursor,
                page_size: query.page_size,
            },
        )
        .await?;
    Ok(Json(page))
}

async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UsageStats>, ServerError> {
    Ok(Json(state.stats.compute_stats(&user_id).await?))
}

async fn user_entitlement(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Entitlement>, ServerError> {
    state
        .entitlements
        .get_entitlement(&user_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound(user_id))
}
