//! HTTP Error Translation - Domain Failures to Status Codes
//!
//! `ApiError` is the single error type returned by handlers. It renders
//! `{ "success": false, "error": ... }` with:
//! - `details` listing every violation for validation failures
//! - an [`ErrorDetail`] response extension carrying the underlying error
//!   text, which `attach_error_detail` logs and (in development only)
//!   copies into the body
//!
//! Status mapping: validation, bad identifier and malformed body → 400,
//! not found and unknown route → 404, rate limited → 429, store → 500.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::{ReportError, StoreError, Violation};

use super::middleware::RateTier;

/// Underlying error text attached to an error response.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Errors surfaced by HTTP handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Request body was not valid JSON (or had the wrong content type).
    #[error("Malformed JSON body")]
    MalformedBody(String),

    /// Caller exhausted a rate-limit tier.
    #[error("Too many requests")]
    RateLimited {
        tier: RateTier,
        retry_after: Duration,
        window: Duration,
    },

    #[error("Route not found")]
    RouteNotFound,

    /// Failure outside the report domain (metrics encoding).
    #[error("Internal server error")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Report(ReportError::Store(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Report(ReportError::ValidationFailed { .. })
            | Self::Report(ReportError::InvalidIdentifier { .. })
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Report(ReportError::NotFound { .. }) | Self::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Report(ReportError::Store(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Human form of a rate-limit window, e.g. "15 minutes".
fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        0..=59 => format!("{secs} seconds"),
        60..=119 => "1 minute".to_string(),
        _ => format!("{} minutes", secs / 60),
    }
}

fn error_body(message: &str, violations: Option<&[Violation]>) -> serde_json::Value {
    let mut body = json!({ "success": false, "error": message });
    if let Some(violations) = violations {
        body["details"] = json!(violations);
    }
    body
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            Self::Report(ReportError::ValidationFailed { ref violations }) => {
                (status, Json(error_body(&self.to_string(), Some(violations.as_slice())))).into_response()
            }
            Self::Report(ReportError::Store(ref err)) => {
                let mut response =
                    (status, Json(error_body("Internal server error", None))).into_response();
                response.extensions_mut().insert(ErrorDetail(err.to_string()));
                response
            }
            Self::MalformedBody(ref detail) | Self::Internal(ref detail) => {
                let detail = ErrorDetail(detail.clone());
                let mut response = (status, Json(error_body(&self.to_string(), None))).into_response();
                response.extensions_mut().insert(detail);
                response
            }
            Self::RateLimited {
                tier,
                retry_after,
                window,
            } => {
                let body = json!({
                    "success": false,
                    "error": "Too many requests",
                    "message": format!(
                        "{}, please try again after {}.",
                        tier.message(),
                        describe_window(window)
                    ),
                    "retryAfter": describe_window(window),
                });
                let mut response = (status, Json(body)).into_response();
                let secs = retry_after.as_secs().max(1);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            Self::Report(_) | Self::RouteNotFound => {
                (status, Json(error_body(&self.to_string(), None))).into_response()
            }
        }
    }
}
