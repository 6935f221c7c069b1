//! Leave requests, finance reports and company metrics share one shape:
//! a filtered, paged listing plus plain CRUD by id.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use platform_api::ApiResult;
use platform_authz::Capability;
use platform_db::{Page, PageRequest};
use products_hr::{
    finance::{self, FinanceReportFilter, FinanceReportRequest, FinanceReportResponse},
    leave::{self, LeaveRequestFilter, LeaveRequestRequest, LeaveRequestResponse},
    metrics::{self, CompanyMetricFilter, CompanyMetricRequest, CompanyMetricResponse},
};

use super::deleted;
use crate::http::{AppState, Caller};

pub(super) fn leave_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leave).post(create_leave))
        .route("/{id}", get(get_leave).put(update_leave).delete(delete_leave))
}

pub(super) fn finance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_finance).post(create_finance))
        .route("/{id}", get(get_finance).put(update_finance).delete(delete_finance))
}

pub(super) fn metric_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_metrics).post(create_metric))
        .route("/{id}", get(get_metric).put(update_metric).delete(delete_metric))
}

const LEAVE_READ: Capability = Capability::ProfileRead;
const LEAVE_WRITE: Capability = Capability::EmployeeWrite;
const FINANCE_READ: Capability = Capability::ReportsAccess;
const FINANCE_WRITE: Capability = Capability::BudgetWrite;
const METRIC_READ: Capability = Capability::ReportsAccess;
const METRIC_WRITE: Capability = Capability::SystemConfig;

async fn list_leave(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
    Query(filter): Query<LeaveRequestFilter>,
) -> ApiResult<Json<Page<LeaveRequestResponse>>> {
    caller.require(LEAVE_READ)?;
    Ok(Json(leave::list(&state.pool, &filter, page).await?))
}

async fn get_leave(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<LeaveRequestResponse>> {
    caller.require(LEAVE_READ)?;
    Ok(Json(leave::get(&state.pool, id).await?))
}

async fn create_leave(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<LeaveRequestRequest>,
) -> ApiResult<(StatusCode, Json<LeaveRequestResponse>)> {
    caller.require(LEAVE_WRITE)?;
    Ok((StatusCode::CREATED, Json(leave::create(&state.pool, request).await?)))
}

async fn update_leave(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(request): Json<LeaveRequestRequest>,
) -> ApiResult<Json<LeaveRequestResponse>> {
    caller.require(LEAVE_WRITE)?;
    Ok(Json(leave::update(&state.pool, id, request).await?))
}

async fn delete_leave(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(LEAVE_WRITE)?;
    deleted(leave::delete(&state.pool, id).await?, "LeaveRequest", id)
}

async fn list_finance(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
    Query(filter): Query<FinanceReportFilter>,
) -> ApiResult<Json<Page<FinanceReportResponse>>> {
    caller.require(FINANCE_READ)?;
    Ok(Json(finance::list(&state.pool, &filter, page).await?))
}

async fn get_finance(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<FinanceReportResponse>> {
    caller.require(FINANCE_READ)?;
    Ok(Json(finance::get(&state.pool, id).await?))
}

async fn create_finance(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<FinanceReportRequest>,
) -> ApiResult<(StatusCode, Json<FinanceReportResponse>)> {
    caller.require(FINANCE_WRITE)?;
    Ok((StatusCode::CREATED, Json(finance::create(&state.pool, request).await?)))
}

async fn update_finance(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(request): Json<FinanceReportRequest>,
) -> ApiResult<Json<FinanceReportResponse>> {
    caller.require(FINANCE_WRITE)?;
    Ok(Json(finance::update(&state.pool, id, request).await?))
}

async fn delete_finance(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(FINANCE_WRITE)?;
    deleted(finance::delete(&state.pool, id).await?, "FinanceReport", id)
}

async fn list_metrics(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
    Query(filter): Query<CompanyMetricFilter>,
) -> ApiResult<Json<Page<CompanyMetricResponse>>> {
    caller.require(METRIC_READ)?;
    Ok(Json(metrics::list(&state.pool, &filter, page).await?))
}

async fn get_metric(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<CompanyMetricResponse>> {
    caller.require(METRIC_READ)?;
    Ok(Json(metrics::get(&state.pool, id).await?))
}

async fn create_metric(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CompanyMetricRequest>,
) -> ApiResult<(StatusCode, Json<CompanyMetricResponse>)> {
    caller.require(METRIC_WRITE)?;
    Ok((StatusCode::CREATED, Json(metrics::create(&state.pool, request).await?)))
}

async fn update_metric(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
    Json(request): Json<CompanyMetricRequest>,
) -> ApiResult<Json<CompanyMetricResponse>> {
    caller.require(METRIC_WRITE)?;
    Ok(Json(metrics::update(&state.pool, id, request).await?))
}

async fn delete_metric(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(METRIC_WRITE)?;
    deleted(metrics::delete(&state.pool, id).await?, "CompanyMetric", id)
}
