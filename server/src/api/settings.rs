use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use platform_api::ApiResult;
use platform_authz::Capability;
use products_hr::settings::{self as settings_service, SettingsRequest, SettingsResponse, SystemInfo};
use serde::Deserialize;
use tracing::instrument;

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(current).put(update))
        .route("/reset", post(reset))
        .route("/test-email", post(test_email))
        .route("/backup", post(backup))
        .route("/clear-cache", post(clear_cache))
        .route("/info", get(info))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestEmail {
    test_email: String,
}

async fn current(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::SystemConfig)?;
    Ok(Json(settings_service::get(&state.pool).await?))
}

#[instrument(name = "http.settings.update", skip_all, fields(caller = caller.id()))]
async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::SystemConfig)?;
    let updated = settings_service::update(&state.pool, request, &caller.user.username).await?;
    Ok(Json(updated))
}

async fn reset(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::SystemConfig)?;
    Ok(Json(settings_service::reset(&state.pool, &caller.user.username).await?))
}

async fn test_email(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<TestEmail>,
) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::SystemConfig)?;
    Ok(Json(settings_service::send_test_email(&state.pool, &request.test_email).await?))
}

async fn backup(caller: Caller) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::BackupRestore)?;
    Ok(Json(settings_service::backup()))
}

async fn clear_cache(caller: Caller) -> ApiResult<Json<SettingsResponse>> {
    caller.require(Capability::SystemMaintenance)?;
    Ok(Json(settings_service::clear_cache()))
}

async fn info(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<SystemInfo>> {
    caller.require(Capability::SystemConfig)?;
    Ok(Json(settings_service::system_info(&state.pool, state.started.elapsed())))
}
