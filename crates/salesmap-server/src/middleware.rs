use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const PASSWORD_HEADER: &str = "x-dashboard-password";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared dashboard secret checked by [`require_dashboard_secret`].
#[derive(Clone)]
pub struct AuthState {
    secret: Option<Arc<str>>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl AuthState {
    /// Builds auth from the configured dashboard password.
    ///
    /// In development a missing password disables auth for local iteration.
    /// In other environments it fails startup.
    pub fn from_password(password: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        match password.map(str::trim).filter(|p| !p.is_empty()) {
            Some(secret) => Ok(Self {
                secret: Some(Arc::from(secret)),
            }),
            None if is_development => {
                tracing::warn!(
                    "SALESMAP_DASHBOARD_PASSWORD not set; dashboard auth disabled in development"
                );
                Ok(Self { secret: None })
            }
            None => anyhow::bail!("SALESMAP_DASHBOARD_PASSWORD is required outside development"),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.secret.is_some()
    }

    fn allows(&self, candidate: &str) -> bool {
        self.secret
            .as_deref()
            .is_some_and(|secret| bool::from(secret.as_bytes().ct_eq(candidate.as_bytes())))
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is inserted into request
/// extensions as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the dashboard secret when enabled.
pub async fn require_dashboard_secret(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled() {
        return next.run(req).await;
    }

    match extract_secret(req.headers()) {
        Some(candidate) if auth.allows(candidate) => next.run(req).await,
        _ => {
            tracing::debug!(path = %req.uri().path(), "rejected request without valid secret");
            (
                StatusCode::UNAUTHORIZED,
                Json(MiddlewareErrorBody {
                    error: MiddlewareError {
                        code: "unauthorized",
                        message: "missing or incorrect dashboard password",
                    },
                }),
            )
                .into_response()
        }
    }
}

fn extract_secret(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer
        .or_else(|| headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok()))
        .filter(|s| !s.trim().is_empty())
}
