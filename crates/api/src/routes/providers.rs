use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/providers", get(handlers::providers::list_providers))
        .route("/api/providers/:id", get(handlers::providers::get_provider))
        .route(
            "/api/providers/:id/slots",
            get(handlers::providers::get_slots),
        )
}
