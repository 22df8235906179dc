use axum::{extract::State, http::StatusCode, Json};
use carebook_core::{
    guard::ANY_ROLE,
    models::principal::{AuthGrant, Credentials, Principal},
    session::AuthBackend,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    middleware::{auth::CurrentPrincipal, error_handling::AppError},
    ApiState,
};

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthGrant>, AppError> {
    let grant = state.auth.login(&credentials).await?;
    info!(principal = %grant.principal.id, role = %grant.principal.role, "login");
    Ok(Json(grant))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn logout(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
) -> Result<StatusCode, AppError> {
    let principal = caller.require(ANY_ROLE)?;
    if let Some(token) = &caller.token {
        state.auth.logout(token).await?;
    }
    info!(principal = %principal.id, "logout");
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn me(caller: CurrentPrincipal) -> Result<Json<Principal>, AppError> {
    Ok(Json(caller.require(ANY_ROLE)?.clone()))
}
