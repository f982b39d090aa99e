//! Local HTTP proxy surface.
//!
//! Exposes the instance console over a small REST API so thin front-ends can
//! talk to one long-lived session instead of shipping credentials to the
//! browser:
//!
//! | Method | Path                        | Response                         |
//! |--------|-----------------------------|----------------------------------|
//! | GET    | /api/health                 | `{success, message, timestamp}`  |
//! | GET    | /api/instances              | `{success, instances, warnings}` |
//! | GET    | /api/instances/:id          | `{success, instance}` or 404     |
//! | POST   | /api/instances/:id/start    | `{success, message}`             |
//! | POST   | /api/instances/:id/stop     | `{success, message}`             |
//! | POST   | /api/instances/:id/reboot   | `{success, message}`             |
//!
//! `GET /api/instances` accepts optional `ids`, `tags` and `state` query
//! parameters fed through the filter normalizer; normalizer warnings ride
//! along in the response without failing the request.

use anyhow::Context as _;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::config::ServerConfig;
use super::dispatch::InstanceAction;
use super::filters::{normalize, RawFilter};
use super::inventory::InstanceDetail;
use super::presentation::InstanceRow;
use super::sdk_errors::ConsoleError;
use super::{FetchOutcome, InstanceConsole};

/// Shared state passed to all request handlers.
#[derive(Clone)]
struct AppState {
    console: Arc<InstanceConsole>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    ids: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    instances: Vec<InstanceRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DetailResponse {
    success: bool,
    instance: InstanceDetail,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    success: bool,
    message: String,
    timestamp: String,
}

/// Handler-level error: a categorized console failure, or a dropped
/// concurrent fetch surfaced as a conflict.
enum ApiError {
    Console(ConsoleError),
    Conflict(&'static str),
}

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        Self::Console(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            success: bool,
            message: String,
        }

        let (status, message) = match self {
            Self::Console(err) => {
                let status = match err {
                    ConsoleError::Validation(_) => StatusCode::BAD_REQUEST,
                    ConsoleError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    ConsoleError::NotFound(_) => StatusCode::NOT_FOUND,
                    ConsoleError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
                };
                warn!(error = %err, label = err.short_label(), "request failed");
                (status, err.user_message())
            }
            Self::Conflict(message) => (StatusCode::CONFLICT, message.to_string()),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Build the router with all endpoints.
pub fn router(console: Arc<InstanceConsole>) -> Router {
    // Permissive CORS so a local single-page front-end can call the proxy.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/instances", get(list_instances))
        .route("/api/instances/:id", get(get_instance))
        .route("/api/instances/:id/start", post(start_instance))
        .route("/api/instances/:id/stop", post(stop_instance))
        .route("/api/instances/:id/reboot", post(reboot_instance))
        .with_state(AppState { console })
        .layer(cors)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &ServerConfig, console: Arc<InstanceConsole>) -> anyhow::Result<()> {
    let app = router(console);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: format!(
            "ec2dash {} ({}@{})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_BRANCH"),
            env!("GIT_COMMIT")
        ),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn list_instances(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let raw = RawFilter {
        instance_ids: query.ids,
        tags: query.tags,
        state: query.state,
    };
    let normalized = normalize(&raw);
    for warning in &normalized.warnings {
        warn!("{}", warning);
    }

    match state.console.refresh(Some(normalized.filter)).await? {
        FetchOutcome::Completed(instances) => Ok(Json(ListResponse {
            success: true,
            instances,
            warnings: normalized.warnings,
        })),
        FetchOutcome::Dropped => Err(ApiError::Conflict("a fetch is already in progress")),
    }
}

async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetailResponse>, ApiError> {
    let instance = state.console.instance_detail(&id).await?;
    Ok(Json(DetailResponse {
        success: true,
        instance,
    }))
}

async fn start_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    run_action(state, InstanceAction::Start, id).await
}

async fn stop_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    run_action(state, InstanceAction::Stop, id).await
}

async fn reboot_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    run_action(state, InstanceAction::Reboot, id).await
}

async fn run_action(
    state: AppState,
    action: InstanceAction,
    id: String,
) -> Result<Json<ActionResponse>, ApiError> {
    let ack = state.console.dispatch(action, &id).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: ack.message(),
    }))
}
