use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::db::repository;
use crate::snapshot::RunwaySnapshot;

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let total_snapshots = repository::count_snapshots(&state.pool)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let latest = repository::latest_snapshot(&state.pool)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        total_snapshots,
        latest_timestamp: latest.map(|s| s.timestamp),
    }))
}

/// Most recently stored runway snapshot.
pub async fn check(State(state): State<Arc<AppState>>) -> ApiResult<RunwaySnapshot> {
    tracing::info!("Handling /check");
    match repository::latest_snapshot(&state.pool).await {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            "No runway snapshot has been recorded yet",
        )),
        Err(e) => {
            let message = format!("Failed to handle /check. Error: {:#}", e);
            tracing::error!("{}", message);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, message))
        }
    }
}

pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::NOT_FOUND, "Path not found")
}
