mod dashboard;
mod export;
mod records;
mod refresh;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use salesmap_core::{FilterQuery, MapDefaults, MapView};
use salesmap_sheets::SourceError;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::RecordCache;
use crate::middleware::{request_id, require_dashboard_secret, AuthState, RequestId, PASSWORD_HEADER};
use crate::scheduler::AutoRefresh;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RecordCache>,
    pub auto_refresh: Arc<AutoRefresh>,
    pub map: Arc<MapDefaults>,
    pub export_file_name: Arc<str>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    source: String,
    record_count: Option<usize>,
    snapshot_age_secs: Option<u64>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "source_rejected" => StatusCode::BAD_GATEWAY,
            "source_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_source_error(request_id: String, error: &SourceError) -> ApiError {
    match error {
        SourceError::Unavailable(_) => {
            tracing::error!(error = %error, "record source unavailable");
            ApiError::new(request_id, "source_unavailable", error.to_string())
        }
        SourceError::Rejected(_) => {
            tracing::warn!(error = %error, "record source rejected the request");
            ApiError::new(request_id, "source_rejected", error.to_string())
        }
    }
}

/// Query string shared by every dashboard read.
///
/// `categories` is comma-separated; an empty value selects nothing. Unset
/// bounds fall back to the extents of the current record set.
#[derive(Debug, Default, Deserialize)]
pub(super) struct DashboardParams {
    pub categories: Option<String>,
    pub sales_min: Option<f64>,
    pub sales_max: Option<f64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub view: MapView,
}

impl DashboardParams {
    pub(super) fn filter_query(&self, request_id: &str) -> Result<FilterQuery, ApiError> {
        let invalid = |message: &str| ApiError::new(request_id, "validation_error", message);

        for bound in [self.sales_min, self.sales_max].into_iter().flatten() {
            if bound.is_nan() {
                return Err(invalid("sales bounds must be numbers"));
            }
        }
        if let (Some(min), Some(max)) = (self.sales_min, self.sales_max) {
            if min > max {
                return Err(invalid("sales_min must not exceed sales_max"));
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(invalid("start must not be after end"));
            }
        }

        Ok(FilterQuery {
            categories: self.categories.as_deref().map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            }),
            sales_min: self.sales_min,
            sales_max: self.sales_max,
            start: self.start,
            end: self.end,
        })
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(PASSWORD_HEADER),
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/filters", get(dashboard::filter_options))
        .route(
            "/api/v1/records",
            get(records::list_records).post(records::create_record),
        )
        .route("/api/v1/map", get(dashboard::map_view))
        .route("/api/v1/summary", get(dashboard::category_summary))
        .route("/api/v1/export.csv", get(export::export_csv))
        .route("/api/v1/refresh", post(refresh::refresh_now))
        .route(
            "/api/v1/auto-refresh",
            get(refresh::auto_refresh_status).put(refresh::update_auto_refresh),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_dashboard_secret,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let snapshot = state.cache.peek().await;
    ApiResponse::new(
        HealthData {
            status: "ok",
            source: state.cache.source_description(),
            record_count: snapshot.as_ref().map(|s| s.records.len()),
            snapshot_age_secs: snapshot.as_ref().map(|s| s.age().as_secs()),
        },
        req_id.0,
    )
}
