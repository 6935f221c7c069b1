use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use platform_api::ApiResult;
use platform_authz::{Capability, Role};
use products_hr::users::{self as user_service, RoleCount, SystemStats, UserSummary};
use serde::Deserialize;
use tracing::instrument;

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/role-counts", get(role_counts))
        .route("/stats", get(stats))
        .route("/{id}/role", put(change_role))
        .route("/{id}/enabled", put(set_enabled))
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

#[derive(Debug, Deserialize)]
struct EnabledChange {
    enabled: bool,
}

async fn list(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<UserSummary>>> {
    caller.require(Capability::UserManagement)?;
    Ok(Json(user_service::list(&state.pool, caller.role).await?))
}

async fn role_counts(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<RoleCount>>> {
    caller.require(Capability::UserManagement)?;
    Ok(Json(user_service::counts_by_role(&state.pool).await?))
}

async fn stats(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<SystemStats>> {
    caller.require(Capability::ReportsAccess)?;
    Ok(Json(user_service::stats(&state.pool, caller.role).await?))
}

#[instrument(name = "http.users.change_role", skip_all, fields(caller = caller.id(), target = id))]
async fn change_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(change): Json<RoleChange>,
) -> ApiResult<Json<UserSummary>> {
    caller.require(Capability::UserManagement)?;
    Ok(Json(user_service::change_role(&state.pool, &caller.user, id, change.role).await?))
}

async fn set_enabled(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(change): Json<EnabledChange>,
) -> ApiResult<Json<UserSummary>> {
    caller.require(Capability::UserManagement)?;
    Ok(Json(user_service::set_enabled(&state.pool, &caller.user, id, change.enabled).await?))
}
