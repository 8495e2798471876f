use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::candidates::StrategyView;
use crate::config::Config;
use crate::engine::{AnalysisParams, AnalysisReport, MiningEngine, MiningError};
use crate::model::{UserIndex, UserRecord};
use crate::optimizer::{Policy, POLICIES};
use crate::progress::TracingProgress;
use crate::strategy::{Strategy, DEFAULT_CATALOG};

#[derive(Clone)]
struct ApiState {
    config: Config,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Deserialize)]
struct AnalyzeRequest {
    users: Vec<UserRecord>,
    targets: Vec<String>,
    threshold: Option<f64>,
    min_group: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let app = router(ApiState { config });
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/strategies", get(strategies))
        .route("/v1/policies", get(policies))
        .route("/v1/config", get(show_config))
        .route("/v1/analyze", post(analyze))
        .route("/v1/candidates", post(candidates))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn strategies() -> Json<ApiResponse<Vec<Strategy>>> {
    ok(DEFAULT_CATALOG.to_vec())
}

async fn policies() -> Json<ApiResponse<Vec<Policy>>> {
    ok(POLICIES.to_vec())
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

fn request_params(config: &Config, request: &AnalyzeRequest) -> Result<AnalysisParams, ApiError> {
    AnalysisParams::new(
        request.threshold.unwrap_or(config.analysis.threshold),
        request.min_group.unwrap_or(config.analysis.min_group),
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))
}

async fn analyze(
    State(state): State<ApiState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisReport> {
    let params = request_params(&state.config, &request)?;

    let AnalyzeRequest { users, targets, .. } = request;
    info!(
        users = users.len(),
        targets = targets.len(),
        "analysis requested"
    );

    let report = tokio::task::spawn_blocking(move || -> Result<AnalysisReport, MiningError> {
        let index: UserIndex = users.into_iter().collect();
        let engine = MiningEngine::new(&index, &targets, &DEFAULT_CATALOG)?;
        Ok(engine.analyze(&params, &mut TracingProgress))
    })
    .await
    .map_err(ApiError::internal)?
    .map_err(|e| {
        warn!("rejected analysis request: {e}");
        ApiError::bad_request(e.to_string())
    })?;

    Ok(ok(report))
}

/// Candidate roles per strategy at the request's threshold, without optimizing.
async fn candidates(
    State(state): State<ApiState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Vec<StrategyView>> {
    let params = request_params(&state.config, &request)?;
    let AnalyzeRequest { users, targets, .. } = request;

    let views = tokio::task::spawn_blocking(move || -> Result<Vec<StrategyView>, MiningError> {
        let index: UserIndex = users.into_iter().collect();
        let engine = MiningEngine::new(&index, &targets, &DEFAULT_CATALOG)?;
        Ok(engine.browse(&params))
    })
    .await
    .map_err(ApiError::internal)?
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(ok(views))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
