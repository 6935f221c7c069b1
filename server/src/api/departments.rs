use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use platform_api::ApiResult;
use platform_authz::Capability;
use products_hr::{
    departments::{self as department_service, DepartmentBudget, DepartmentRequest, DepartmentResponse},
    employees::EmployeeResponse,
};

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(fetch).put(update).delete(remove))
        .route("/{id}/budget", get(budget))
        .route("/{id}/employees", get(members))
        .route("/{id}/head/{employee_id}", put(assign_head))
}

async fn list(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<DepartmentResponse>>> {
    caller.require(Capability::DepartmentRead)?;
    Ok(Json(department_service::list(&state.pool).await?))
}

async fn fetch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<DepartmentResponse>> {
    caller.require(Capability::DepartmentRead)?;
    Ok(Json(department_service::get(&state.pool, id).await?))
}

async fn budget(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<DepartmentBudget>> {
    caller.require(Capability::BudgetRead)?;
    Ok(Json(department_service::budget(&state.pool, id).await?))
}

async fn members(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    caller.require(Capability::DepartmentRead)?;
    Ok(Json(department_service::employees(&state.pool, id).await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<DepartmentRequest>,
) -> ApiResult<(StatusCode, Json<DepartmentResponse>)> {
    caller.require(Capability::DepartmentCreate)?;
    let created = department_service::create(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(request): Json<DepartmentRequest>,
) -> ApiResult<Json<DepartmentResponse>> {
    caller.require(Capability::DepartmentWrite)?;
    Ok(Json(department_service::update(&state.pool, id, request).await?))
}

async fn assign_head(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, employee_id)): Path<(i32, i32)>,
) -> ApiResult<Json<DepartmentResponse>> {
    caller.require(Capability::DepartmentWrite)?;
    let updated = department_service::assign_head(&state.pool, id, employee_id, Some(caller.id())).await?;
    Ok(Json(updated))
}

async fn remove(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(Capability::DepartmentDelete)?;
    department_service::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use platform_authz::Role;
    use serde_json::json;

    use crate::http::tests::TestApp;

    #[tokio::test]
    async fn department_lifecycle_with_head() {
        let app = TestApp::new().await;
        let admin = app.user("admin", Role::Admin).await;
        let finance = app.user("fin", Role::FinanceManager).await;

        let (status, dept) = app
            .send(
                Method::POST,
                "/api/departments",
                Some(admin),
                Some(json!({"name": "Engineering", "budgetAllocated": 1000, "budgetSpent": 250})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let dept_id = dept["id"].as_i64().unwrap();

        let (status, _) = app
            .send(Method::POST, "/api/departments", Some(admin), Some(json!({"name": "Engineering"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, budget) = app
            .send(Method::GET, &format!("/api/departments/{dept_id}/budget"), Some(finance), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let remaining: f64 = budget["budgetRemaining"].as_str().unwrap().parse().unwrap();
        assert_eq!(remaining, 750.0);
        let (status, _) = app.send(Method::GET, "/api/departments", Some(finance), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, employee) = app
            .send(
                Method::POST,
                "/api/employees",
                Some(admin),
                Some(json!({"firstName": "Edsger", "lastName": "Dijkstra"})),
            )
            .await;
        let emp_id = employee["id"].as_i64().unwrap();
        let (status, headed) = app
            .send(
                Method::PUT,
                &format!("/api/departments/{dept_id}/head/{emp_id}"),
                Some(admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headed["headEmployeeName"], "Edsger Dijkstra");
        assert_eq!(headed["employeeCount"], 1);

        let (status, body) = app
            .send(Method::DELETE, &format!("/api/departments/{dept_id}"), Some(admin), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);

        app.send(Method::DELETE, &format!("/api/employees/{emp_id}"), Some(admin), None)
            .await;
        let (_, after) = app
            .send(Method::GET, &format!("/api/departments/{dept_id}"), Some(admin), None)
            .await;
        assert!(after["headEmployeeId"].is_null());
        let (status, _) = app
            .send(Method::DELETE, &format!("/api/departments/{dept_id}"), Some(admin), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
