use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use platform_api::ApiResult;
use products_hr::users::{self as user_service, AuthResponse, LoginRequest, RegisterRequest};
use serde_json::{Value, json};
use tracing::instrument;

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[instrument(name = "http.auth.login", skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(user_service::login(&state.pool, request).await?))
}

#[instrument(name = "http.auth.register", skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let profile = user_service::register(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn me(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(user_service::me(&state.pool, caller.id()).await?))
}

/// Sessions are not held server side; this only acknowledges the client.
async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}
