use axum::{
    extract::{Path, Query, State},
    Json,
};
use carebook_core::{
    guard::ANY_ROLE,
    models::{
        provider::Provider,
        time_slot::{SlotsQuery, SlotsResponse},
    },
};
use std::sync::Arc;

use crate::{
    middleware::{auth::CurrentPrincipal, error_handling::AppError},
    ApiState,
};

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_providers(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
) -> Result<Json<Vec<Provider>>, AppError> {
    caller.require(ANY_ROLE)?;
    Ok(Json(state.directory.list().await?))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_provider(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<Provider>, AppError> {
    caller.require(ANY_ROLE)?;
    Ok(Json(state.slots().provider(&id).await?))
}

/// Slots are recomputed from the store on every request.
#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_slots(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    caller.require(ANY_ROLE)?;
    let slots = state.slots().slots_for(&id, query.date).await?;

    Ok(Json(SlotsResponse {
        provider_id: id,
        date: query.date,
        slots,
    }))
}
