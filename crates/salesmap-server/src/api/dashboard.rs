use std::collections::BTreeSet;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use salesmap_core::{
    render_map, summarize, BoundaryOverlay, CategorySummary, DateRange, FilterState, MapRender,
    MapView, SalesRange, TileLayer,
};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_source_error, ApiError, ApiResponse, AppState, DashboardParams};

/// Default selection for the current set, used to seed filter controls.
#[derive(Debug, Serialize)]
pub(super) struct FilterOptions {
    pub categories: BTreeSet<String>,
    pub sales: Option<SalesRange>,
    pub dates: Option<DateRange>,
    pub record_count: usize,
    pub dropped_rows: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct MapData {
    pub center: MapCenter,
    pub zoom: u8,
    pub tiles: TileLayer,
    pub overlays: Vec<BoundaryOverlay>,
    pub view: MapView,
    pub record_count: usize,
    #[serde(flatten)]
    pub render: MapRender,
}

#[derive(Debug, Serialize)]
pub(super) struct SummaryData {
    pub groups: Vec<CategorySummary>,
    pub location_count: usize,
    pub total_sales: f64,
}

pub(super) async fn filter_options(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<FilterOptions>>, ApiError> {
    let snapshot = state
        .cache
        .current()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let defaults = FilterState::defaults_for(&snapshot.records);
    Ok(ApiResponse::new(
        FilterOptions {
            categories: defaults.categories,
            sales: defaults.sales,
            dates: defaults.dates,
            record_count: snapshot.records.len(),
            dropped_rows: snapshot.dropped_rows,
            fetched_at: snapshot.fetched_at,
        },
        req_id.0,
    ))
}

pub(super) async fn map_view(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ApiResponse<MapData>>, ApiError> {
    let query = params.filter_query(&req_id.0)?;
    let snapshot = state
        .cache
        .current()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let records = query.apply(&snapshot.records);
    tracing::debug!(view = %params.view, records = records.len(), "rendering map");

    Ok(ApiResponse::new(
        MapData {
            center: MapCenter {
                latitude: state.map.center_latitude,
                longitude: state.map.center_longitude,
            },
            zoom: state.map.zoom,
            tiles: state.map.tiles.clone(),
            overlays: state.map.overlays.clone(),
            view: params.view,
            record_count: records.len(),
            render: render_map(&records, params.view),
        },
        req_id.0,
    ))
}

pub(super) async fn category_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ApiResponse<SummaryData>>, ApiError> {
    let query = params.filter_query(&req_id.0)?;
    let snapshot = state
        .cache
        .current()
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let records = query.apply(&snapshot.records);
    let groups = summarize(&records);
    let total_sales = groups.iter().map(|g| g.total_sales).sum();

    Ok(ApiResponse::new(
        SummaryData {
            groups,
            location_count: records.len(),
            total_sales,
        },
        req_id.0,
    ))
}
