//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the CareBook API.
//! It maps domain errors to HTTP status codes and JSON error bodies so every
//! endpoint fails the same way.
//!
//! Guard denials carry a `redirect` field telling the caller where to go next:
//! `/login` for a missing session and `/not-permitted` for a role mismatch.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carebook_core::{
    errors::CareError,
    guard::{LOGIN_REDIRECT, NOT_PERMITTED_REDIRECT},
};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps `CareError` and implements `IntoResponse` so handlers can
/// use `?` on any core operation.
///
/// # Example
///
/// ```ignore
/// async fn handler(
///     State(state): State<Arc<ApiState>>,
///     Path(id): Path<String>,
/// ) -> Result<Json<Provider>, AppError> {
///     let provider = state.booking.slots().provider(&id).await?;
///     Ok(Json(provider))
/// }
/// ```
#[derive(Debug)]
pub struct AppError(pub CareError);

/// HTTP status for each error kind.
pub fn status_for(err: &CareError) -> StatusCode {
    match err {
        CareError::Validation(_) => StatusCode::BAD_REQUEST,
        CareError::Authentication(_) => StatusCode::UNAUTHORIZED,
        CareError::Forbidden(_) => StatusCode::FORBIDDEN,
        CareError::NotFound(_) => StatusCode::NOT_FOUND,
        CareError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CareError::Conflict(_) => StatusCode::CONFLICT,
        CareError::StaleState { .. } => StatusCode::CONFLICT,
        CareError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CareError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(err: &CareError, status: StatusCode) -> Value {
    // Infrastructure details stay in the log.
    let message = if status.is_server_error() {
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    let mut body = json!({
        "error": message,
        "kind": err.kind(),
    });

    match err {
        CareError::Authentication(detail) => {
            body["detail"] = json!(detail);
            body["redirect"] = json!(LOGIN_REDIRECT);
        }
        CareError::Forbidden(detail) => {
            body["detail"] = json!(detail);
            body["redirect"] = json!(NOT_PERMITTED_REDIRECT);
        }
        CareError::NotFound(detail) | CareError::Conflict(detail) => {
            body["detail"] = json!(detail);
        }
        CareError::Validation(errors) => {
            body["fields"] = json!(errors);
        }
        CareError::InvalidTransition { from, to } => {
            body["from"] = json!(from);
            body["to"] = json!(to);
        }
        CareError::StaleState { expected, actual } => {
            body["expected"] = json!(expected);
            body["actual"] = json!(actual);
        }
        CareError::Database(_) | CareError::Internal(_) => {}
    }

    body
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if self.0.is_expected() {
            debug!(kind = self.0.kind(), "request rejected: {}", self.0);
        } else if status.is_server_error() {
            error!(kind = self.0.kind(), "request failed: {:?}", self.0);
        } else {
            warn!(kind = self.0.kind(), "request rejected: {}", self.0);
        }

        (status, Json(body_for(&self.0, status))).into_response()
    }
}

/// Automatic conversion from CareError to AppError
impl From<CareError> for AppError {
    fn from(err: CareError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Infrastructure failures surface as `CareError::Database`.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(CareError::Database(err))
    }
}

/// Maps a CareError to an HTTP response
pub fn map_error(err: CareError) -> Response {
    AppError(err).into_response()
}
