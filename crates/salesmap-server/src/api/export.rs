use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use salesmap_core::to_csv_bytes;

use crate::middleware::RequestId;

use super::{map_source_error, ApiError, AppState, DashboardParams};

pub(super) async fn export_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<DashboardParams>,
) -> Result<Response, ApiError> {
    let query = params.filter_query(&req_id.0)?;
    let snapshot = state
        .cache
        .current()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let records = query.apply(&snapshot.records);
    let body = to_csv_bytes(&records).map_err(|e| {
        tracing::error!(error = %e, "csv export failed");
        ApiError::new(req_id.0.clone(), "internal_error", "csv export failed")
    })?;
    tracing::info!(records = records.len(), bytes = body.len(), "csv export");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&state.export_file_name),
            ),
        ],
        body,
    )
        .into_response())
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\' || *c == ' ')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
