//! REST handlers. Every handler extracts a [`Caller`](crate::http::Caller)
//! unless the route is public, then checks the capability the route needs
//! before calling into the HR services.

use axum::{Router, http::StatusCode};
use platform_api::{ApiError, ApiResult};

use crate::http::AppState;

mod auth;
mod departments;
mod employees;
mod notifications;
mod records;
mod settings;
mod users;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/employees", employees::routes())
        .nest("/departments", departments::routes())
        .nest("/leave-requests", records::leave_routes())
        .nest("/finance-reports", records::finance_routes())
        .nest("/company-metrics", records::metric_routes())
        .nest("/notifications", notifications::routes())
        .nest("/settings/system", settings::routes())
        .nest("/users", users::routes())
}

/// Maps a delete that reports whether a row existed onto 204 / 404.
fn deleted(existed: bool, entity: &str, id: i32) -> ApiResult<StatusCode> {
    if existed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("{entity} not found with id: {id}")))
    }
}
