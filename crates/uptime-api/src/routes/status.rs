use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use uptime_core::{CheckResult, CycleReport, CycleSummary, Target};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TargetsResponse {
    pub timeout_secs: f64,
    pub targets: Vec<Target>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub last_cycle: CycleSummary,
    pub results: Vec<CheckResult>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/targets", get(get_targets))
        .route("/status", get(get_status))
        .route("/cycles", post(run_cycle))
}

/// GET /api/v1/targets
async fn get_targets(State(state): State<AppState>) -> Json<TargetsResponse> {
    Json(TargetsResponse {
        timeout_secs: state.monitor.config().request_timeout.as_secs_f64(),
        targets: state.monitor.targets().to_vec(),
    })
}

/// GET /api/v1/status
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let last_cycle = state
        .last_cycle
        .read()
        .await
        .clone()
        .ok_or_else(|| ApiError::NotFound("No check cycle has completed yet".into()))?;

    Ok(Json(StatusResponse {
        last_cycle,
        results: state.latest_results(),
    }))
}

/// POST /api/v1/cycles
async fn run_cycle(State(state): State<AppState>) -> Result<Json<CycleReport>, ApiError> {
    state
        .try_run_cycle()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::Conflict("A check cycle is already running".into()))
}
