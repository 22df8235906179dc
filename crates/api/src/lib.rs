//! # CareBook API
//!
//! The API crate provides the web server for the CareBook appointment service.
//! It exposes login, provider and slot lookup, booking, and the appointment
//! lifecycle over JSON.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into core operations
//! - **Middleware**: Authentication and error mapping
//! - **Config**: Environment driven settings
//!
//! The API uses Axum as the web framework. Storage is reached only through the
//! store traits of `carebook-core`, so the same router runs on PostgreSQL or
//! on the in-memory stores.

/// Configuration module for API settings
pub mod config;
/// Request handlers that call into the core services
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;
/// Demo account loading
pub mod seed;

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    BoxError, Json, Router,
};
use carebook_core::{
    booking::BookingService,
    clock::Clock,
    lifecycle::LifecycleManager,
    slots::SlotService,
    store::{AccountStore, AppointmentStore, ProviderDirectory},
};
use eyre::Result;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::middleware::auth::PasswordAuthBackend;

/// Shared application state that is accessible to all request handlers
///
/// Every service holds its stores behind trait objects; handlers never touch a
/// store directly except through these services.
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(ApiState::new(store, directory, accounts, Arc::new(SystemClock)));
/// let app = carebook_api::app(state);
/// ```
pub struct ApiState {
    /// Owner of every appointment write
    pub lifecycle: Arc<LifecycleManager>,
    /// Booking workflow driver
    pub booking: BookingService,
    pub directory: Arc<dyn ProviderDirectory>,
    pub accounts: Arc<dyn AccountStore>,
    /// Password login and bearer token resolution
    pub auth: PasswordAuthBackend,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ProviderDirectory>,
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lifecycle = Arc::new(LifecycleManager::new(store.clone(), clock.clone()));
        let slots = SlotService::new(directory.clone(), store, clock);
        let booking = BookingService::new(slots, lifecycle.clone());

        Self {
            lifecycle,
            booking,
            directory,
            auth: PasswordAuthBackend::new(accounts.clone()),
            accounts,
        }
    }

    pub fn slots(&self) -> &SlotService {
        self.booking.slots()
    }
}

/// Builds the application router with every route attached to `state`.
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Login, logout, current principal
        .merge(routes::auth::routes())
        // Provider directory and slot listing
        .merge(routes::providers::routes())
        // Booking and lifecycle
        .merge(routes::appointments::routes())
        .with_state(state)
}

/// Installs the global `tracing` subscriber at `level`.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("request timed out");
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "Request timed out", "kind": "timeout" })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Unhandled error: {}", err), "kind": "internal" })),
        )
    }
}

/// Starts the API server with the provided configuration and state
///
/// # Arguments
///
/// * `config` - API configuration including host, port, and other settings
/// * `state` - Shared services built over the chosen storage backend
///
/// # Returns
///
/// * `Result<()>` - Success or error result
///
/// # Example
///
/// ```ignore
/// let config = ApiConfig::from_env()?;
/// carebook_api::init_tracing(config.log_level)?;
/// start_server(config, Arc::new(state)).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, state: Arc<ApiState>) -> Result<()> {
    let app = app(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();

        let cors = tower_http::cors::CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_origin(origins)
            .allow_credentials(true);

        app.layer(cors)
    } else {
        app
    };

    // Add request timeout middleware
    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
