use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            post(handlers::appointments::book_appointment)
                .get(handlers::appointments::list_appointments),
        )
        .route(
            "/api/appointments/hold",
            post(handlers::appointments::hold_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment),
        )
        .route(
            "/api/appointments/:id/transition",
            post(handlers::appointments::transition_appointment),
        )
}
