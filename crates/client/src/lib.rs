//! # CareBook client
//!
//! Typed access to the CareBook HTTP API with a durable session.
//!
//! The client keeps the logged-in principal and bearer token in a
//! [`SessionStore`], persisted to a JSON file by default, so a later run picks
//! the session up again. Every call that needs a session sends the stored
//! token; the server remains the authority on what the caller may do.

pub mod config;
pub mod http;

use carebook_core::{
    errors::{CareError, CareResult},
    guard,
    models::{
        appointment::{
            AppointmentId, AppointmentQuery, AppointmentResponse, AppointmentStatus,
            BookAppointmentRequest, HoldAppointmentRequest, TransitionAppointmentRequest,
        },
        principal::{Credentials, Principal, Role},
        provider::Provider,
        time_slot::SlotsResponse,
    },
    session::{FileSessionPersistence, SessionPersistence, SessionStore},
};
use chrono::NaiveDate;
use eyre::{Result, WrapErr};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    config::ClientConfig,
    http::{send_empty, send_json, HttpAuthBackend},
};

pub struct CareClient<P = FileSessionPersistence> {
    http: Client,
    config: ClientConfig,
    session: SessionStore<HttpAuthBackend, P>,
}

impl CareClient<FileSessionPersistence> {
    /// Client whose session lives in `config.session_file`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let persistence = FileSessionPersistence::new(config.session_file.clone());
        Self::with_persistence(config, persistence)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }
}

impl<P: SessionPersistence> CareClient<P> {
    pub fn with_persistence(config: ClientConfig, persistence: P) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;

        let backend = HttpAuthBackend::new(http.clone(), config.clone());
        let session = SessionStore::hydrate(backend, persistence);

        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore<HttpAuthBackend, P> {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str) -> CareResult<Principal> {
        let principal = self
            .session
            .login(&Credentials {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(principal = %principal.id, "logged in to {}", self.config.api_url);
        Ok(principal)
    }

    pub async fn logout(&self) -> CareResult<()> {
        self.session.logout().await
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.session.current_principal()
    }

    /// Local guard check against the stored session; the server re-checks.
    pub fn authorize(&self, roles: &[Role]) -> guard::Decision {
        guard::authorize(self.current_principal().as_ref(), roles)
    }

    /// Asks the server who the stored token belongs to.
    pub async fn me(&self) -> CareResult<Principal> {
        self.get_json("/api/auth/me").await
    }

    pub async fn providers(&self) -> CareResult<Vec<Provider>> {
        self.get_json("/api/providers").await
    }

    pub async fn provider(&self, provider_id: &str) -> CareResult<Provider> {
        self.get_json(&format!("/api/providers/{}", provider_id)).await
    }

    pub async fn slots(&self, provider_id: &str, date: NaiveDate) -> CareResult<SlotsResponse> {
        let request = self
            .authed(self.http.get(self.config.url(&format!("/api/providers/{}/slots", provider_id))))?
            .query(&[("date", date.to_string())]);
        send_json(request).await
    }

    pub async fn book(&self, request: &BookAppointmentRequest) -> CareResult<AppointmentResponse> {
        let request = self
            .authed(self.http.post(self.config.url("/api/appointments")))?
            .json(request);
        send_json(request).await
    }

    pub async fn hold(&self, request: &HoldAppointmentRequest) -> CareResult<AppointmentResponse> {
        let request = self
            .authed(self.http.post(self.config.url("/api/appointments/hold")))?
            .json(request);
        send_json(request).await
    }

    pub async fn appointments(&self, query: &AppointmentQuery) -> CareResult<Vec<AppointmentResponse>> {
        let request = self
            .authed(self.http.get(self.config.url("/api/appointments")))?
            .query(query);
        send_json(request).await
    }

    pub async fn appointment(&self, id: &AppointmentId) -> CareResult<AppointmentResponse> {
        self.get_json(&format!("/api/appointments/{}", id)).await
    }

    pub async fn transition(
        &self,
        id: &AppointmentId,
        to: AppointmentStatus,
        provider_notes: Option<String>,
    ) -> CareResult<AppointmentResponse> {
        let request = self
            .authed(self.http.post(self.config.url(&format!("/api/appointments/{}/transition", id))))?
            .json(&TransitionAppointmentRequest { to, provider_notes });
        send_json(request).await
    }

    pub async fn cancel(&self, id: &AppointmentId) -> CareResult<AppointmentResponse> {
        self.transition(id, AppointmentStatus::Cancelled, None).await
    }

    /// Checks that the server is up.
    pub async fn health(&self) -> CareResult<()> {
        send_empty(self.http.get(self.config.url("/health"))).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CareResult<T> {
        send_json(self.authed(self.http.get(self.config.url(path)))?).await
    }

    fn authed(&self, request: RequestBuilder) -> CareResult<RequestBuilder> {
        let token = self
            .session
            .token()
            .ok_or_else(|| CareError::Authentication("login required".to_string()))?;
        Ok(request.bearer_auth(token))
    }
}
