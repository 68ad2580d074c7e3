use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use salesmap_core::{apply_filters, FilterState, NewRecord, Record, SubmissionForm};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_source_error, ApiError, ApiResponse, AppState, DashboardParams};

#[derive(Debug, Serialize)]
pub(super) struct RecordList {
    pub filters: FilterState,
    pub total: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreatedRecord {
    pub record: NewRecord,
    pub recorded_at: DateTime<Utc>,
    /// Size of the reloaded set; `None` if the reload after the append failed.
    pub record_count: Option<usize>,
}

pub(super) async fn list_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ApiResponse<RecordList>>, ApiError> {
    let query = params.filter_query(&req_id.0)?;
    let snapshot = state
        .cache
        .current()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let filters = query.resolve(&snapshot.records);
    let records = apply_filters(&snapshot.records, &filters);

    Ok(ApiResponse::new(
        RecordList {
            filters,
            total: records.len(),
            records,
        },
        req_id.0,
    ))
}

pub(super) async fn create_record(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(form): Json<SubmissionForm>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedRecord>>), ApiError> {
    let record = form
        .validate()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let recorded_at = Utc::now();
    let reloaded = state
        .cache
        .append(&record, recorded_at)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(
            CreatedRecord {
                record,
                recorded_at,
                record_count: reloaded.map(|s| s.records.len()),
            },
            req_id.0,
        ),
    ))
}
