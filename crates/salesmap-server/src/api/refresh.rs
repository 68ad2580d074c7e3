use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::scheduler::AutoRefreshStatus;

use super::{map_source_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    pub record_count: usize,
    pub dropped_rows: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AutoRefreshRequest {
    pub enabled: bool,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

pub(super) async fn refresh_now(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let snapshot = state
        .cache
        .refresh()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        RefreshData {
            record_count: snapshot.records.len(),
            dropped_rows: snapshot.dropped_rows,
            fetched_at: snapshot.fetched_at,
        },
        req_id.0,
    ))
}

pub(super) async fn auto_refresh_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<AutoRefreshStatus>> {
    ApiResponse::new(state.auto_refresh.status().await, req_id.0)
}

pub(super) async fn update_auto_refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AutoRefreshRequest>,
) -> Result<Json<ApiResponse<AutoRefreshStatus>>, ApiError> {
    let result = if body.enabled {
        let interval = body.interval_secs.filter(|secs| *secs > 0).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                "interval_secs must be a positive number of seconds",
            )
        })?;
        state.auto_refresh.enable(interval).await
    } else {
        state.auto_refresh.disable().await
    };

    let status = result.map_err(|e| {
        tracing::error!(error = %e, "failed to update auto-refresh schedule");
        ApiError::new(req_id.0.clone(), "internal_error", "scheduler update failed")
    })?;
    Ok(ApiResponse::new(status, req_id.0))
}
