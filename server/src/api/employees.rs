use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use entity::employees::EmployeeStatus;
use platform_api::ApiResult;
use platform_authz::Capability;
use products_hr::employees::{self as employee_service, EmployeeRequest, EmployeeResponse};
use serde::Deserialize;

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/department/{name}", get(by_department))
        .route("/status/{status}", get(by_status))
        .route("/{id}", get(fetch).put(update).delete(remove))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: EmployeeStatus,
}

async fn list(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    caller.require(Capability::EmployeeRead)?;
    Ok(Json(employee_service::list(&state.pool).await?))
}

async fn search(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    caller.require(Capability::EmployeeRead)?;
    Ok(Json(employee_service::search(&state.pool, &query.q).await?))
}

async fn by_department(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    caller.require(Capability::EmployeeRead)?;
    Ok(Json(employee_service::by_department(&state.pool, &name).await?))
}

async fn by_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(status): Path<EmployeeStatus>,
) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    caller.require(Capability::EmployeeRead)?;
    Ok(Json(employee_service::by_status(&state.pool, status).await?))
}

async fn fetch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<EmployeeResponse>> {
    caller.require(Capability::EmployeeRead)?;
    Ok(Json(employee_service::get(&state.pool, id).await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<EmployeeRequest>,
) -> ApiResult<(StatusCode, Json<EmployeeResponse>)> {
    caller.require(Capability::EmployeeCreate)?;
    let created = employee_service::create(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(request): Json<EmployeeRequest>,
) -> ApiResult<Json<EmployeeResponse>> {
    caller.require(Capability::EmployeeWrite)?;
    Ok(Json(employee_service::update(&state.pool, id, request).await?))
}

async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<EmployeeResponse>> {
    caller.require(Capability::EmployeeWrite)?;
    Ok(Json(employee_service::update_status(&state.pool, id, change.status).await?))
}

async fn remove(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(Capability::EmployeeDelete)?;
    employee_service::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use platform_authz::Role;
    use serde_json::json;

    use crate::http::tests::TestApp;

    #[tokio::test]
    async fn hr_creates_and_admin_deletes() {
        let app = TestApp::new().await;
        let hr = app.user("hr", Role::Hr).await;
        let admin = app.user("admin", Role::Admin).await;

        let (status, created) = app
            .send(
                Method::POST,
                "/api/employees",
                Some(hr),
                Some(json!({"firstName": "Alan", "lastName": "Turing", "department": "Research"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["employeeCode"], "EMPRES001");
        assert_eq!(created["status"], "ACTIVE");
        let id = created["id"].as_i64().unwrap();

        let (status, found) = app.send(Method::GET, "/api/employees/search?q=tur", Some(hr), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/api/employees/{id}/status"),
                Some(hr),
                Some(json!({"status": "ON_LEAVE"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "ON_LEAVE");

        let (status, on_leave) = app.send(Method::GET, "/api/employees/status/ON_LEAVE", Some(hr), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(on_leave.as_array().unwrap().len(), 1);

        let (status, _) = app.send(Method::DELETE, &format!("/api/employees/{id}"), Some(hr), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.send(Method::DELETE, &format!("/api/employees/{id}"), Some(admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app.send(Method::GET, &format!("/api/employees/{id}"), Some(admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], format!("Employee not found with id: {id}"));
    }

    #[tokio::test]
    async fn missing_names_are_reported_per_field() {
        let app = TestApp::new().await;
        let admin = app.user("admin", Role::Admin).await;
        let (status, body) = app
            .send(Method::POST, "/api/employees", Some(admin), Some(json!({"firstName": "", "lastName": ""})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"]["firstName"], "firstName is required");
        assert_eq!(body["validationErrors"]["lastName"], "lastName is required");
    }
}
