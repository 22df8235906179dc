//! Transport helpers shared by the client and its auth backend.

use async_trait::async_trait;
use carebook_core::{
    errors::{CareError, CareResult, ValidationErrors},
    models::{
        appointment::AppointmentStatus,
        principal::{AuthGrant, Credentials},
    },
    session::AuthBackend,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::config::ClientConfig;

/// JSON error body produced by the API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    detail: Option<String>,
    #[serde(default)]
    fields: ValidationErrors,
    from: Option<AppointmentStatus>,
    to: Option<AppointmentStatus>,
    expected: Option<AppointmentStatus>,
    actual: Option<AppointmentStatus>,
}

pub(crate) fn transport_error(err: reqwest::Error) -> CareError {
    CareError::Internal(Box::new(err))
}

/// Rebuilds the `CareError` the server reported.
async fn error_from(response: Response) -> CareError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let detail = body.detail.unwrap_or_else(|| body.error.clone());
    debug!(%status, error = %body.error, "API request failed");

    match status {
        StatusCode::BAD_REQUEST if !body.fields.is_empty() => CareError::Validation(body.fields),
        StatusCode::BAD_REQUEST => CareError::invalid("request", detail),
        StatusCode::UNAUTHORIZED => CareError::Authentication(detail),
        StatusCode::FORBIDDEN => CareError::Forbidden(detail),
        StatusCode::NOT_FOUND => CareError::NotFound(detail),
        StatusCode::UNPROCESSABLE_ENTITY => match (body.from, body.to) {
            (Some(from), Some(to)) => CareError::InvalidTransition { from, to },
            _ => CareError::invalid("request", detail),
        },
        StatusCode::CONFLICT => match (body.expected, body.actual) {
            (Some(expected), Some(actual)) => CareError::StaleState { expected, actual },
            _ => CareError::Conflict(detail),
        },
        _ => CareError::Internal(format!("API returned {}: {}", status, detail).into()),
    }
}

/// Sends `request` and decodes a success body as `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> CareResult<T> {
    let response = request.send().await.map_err(transport_error)?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    response.json::<T>().await.map_err(transport_error)
}

/// Sends `request` and discards any success body.
pub(crate) async fn send_empty(request: RequestBuilder) -> CareResult<()> {
    let response = request.send().await.map_err(transport_error)?;
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    Ok(())
}

/// `AuthBackend` that logs in against the CareBook API.
#[derive(Clone)]
pub struct HttpAuthBackend {
    http: Client,
    config: ClientConfig,
}

impl HttpAuthBackend {
    pub fn new(http: Client, config: ClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> CareResult<AuthGrant> {
        send_json(
            self.http
                .post(self.config.url("/api/auth/login"))
                .json(credentials),
        )
        .await
    }

    async fn logout(&self, token: &str) -> CareResult<()> {
        send_empty(
            self.http
                .post(self.config.url("/api/auth/logout"))
                .bearer_auth(token),
        )
        .await
    }
}
