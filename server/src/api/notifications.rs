use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use entity::notifications::{NotificationKind, NotificationPriority};
use platform_api::ApiResult;
use platform_authz::{Capability, Role};
use platform_db::{Page, PageRequest};
use products_hr::notifications::{
    self as notification_service, Notice, NotificationFilter, NotificationRequest,
    NotificationResponse, NotificationSummary,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(inbox).post(create))
        .route("/unread", get(unread))
        .route("/summary", get(summary))
        .route("/filter", get(filtered))
        .route("/read-all", put(mark_all_read))
        .route("/bulk", post(bulk))
        .route("/role/{role}", post(broadcast))
        .route("/system", post(system))
        .route("/{id}", get(fetch).delete(remove))
        .route("/{id}/read", put(mark_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkRequest {
    recipient_ids: Vec<i32>,
    #[serde(flatten)]
    notice: Notice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemRequest {
    recipient_id: i32,
    title: String,
    message: String,
    #[serde(rename = "type")]
    kind: Option<NotificationKind>,
    priority: Option<NotificationPriority>,
}

#[derive(Debug, Serialize)]
struct Sent {
    sent: usize,
}

#[derive(Debug, Serialize)]
struct Updated {
    updated: u64,
}

async fn inbox(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<Page<NotificationResponse>>> {
    caller.require(Capability::ProfileRead)?;
    Ok(Json(notification_service::list_for_user(&state.pool, caller.id(), page).await?))
}

async fn unread(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<NotificationResponse>>> {
    caller.require(Capability::ProfileRead)?;
    Ok(Json(notification_service::unread(&state.pool, caller.id()).await?))
}

async fn summary(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<NotificationSummary>> {
    caller.require(Capability::ProfileRead)?;
    Ok(Json(notification_service::summary(&state.pool, caller.id()).await?))
}

async fn filtered(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<Json<Page<NotificationResponse>>> {
    caller.require(Capability::ProfileRead)?;
    let page = notification_service::filtered(&state.pool, caller.id(), &filter, page).await?;
    Ok(Json(page))
}

async fn fetch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<NotificationResponse>> {
    caller.require(Capability::ProfileRead)?;
    Ok(Json(notification_service::get(&state.pool, id, caller.id()).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i32>,
) -> ApiResult<Json<NotificationResponse>> {
    caller.require(Capability::ProfileRead)?;
    Ok(Json(notification_service::mark_read(&state.pool, id, caller.id()).await?))
}

async fn mark_all_read(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Updated>> {
    caller.require(Capability::ProfileRead)?;
    let updated = notification_service::mark_all_read(&state.pool, caller.id()).await?;
    Ok(Json(Updated { updated }))
}

async fn remove(State(state): State<AppState>, caller: Caller, Path(id): Path<i32>) -> ApiResult<StatusCode> {
    caller.require(Capability::ProfileRead)?;
    notification_service::delete(&state.pool, id, caller.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller is recorded as sender unless the payload names one.
async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(mut request): Json<NotificationRequest>,
) -> ApiResult<(StatusCode, Json<NotificationResponse>)> {
    caller.require(Capability::UserManagement)?;
    request.sender_id.get_or_insert(caller.id());
    let created = notification_service::create(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn bulk(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<Sent>> {
    caller.require(Capability::UserManagement)?;
    let sent = notification_service::bulk(&state.pool, &request.recipient_ids, &request.notice, Some(caller.id())).await;
    Ok(Json(Sent { sent }))
}

async fn broadcast(
    State(state): State<AppState>,
    caller: Caller,
    Path(role): Path<Role>,
    Json(notice): Json<Notice>,
) -> ApiResult<Json<Sent>> {
    caller.require_role(Role::Admin)?;
    let sent = notification_service::send_to_role(&state.pool, role, &notice, Some(caller.id())).await?;
    Ok(Json(Sent { sent }))
}

async fn system(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SystemRequest>,
) -> ApiResult<(StatusCode, Json<NotificationResponse>)> {
    caller.require_role(Role::Admin)?;
    let created = notification_service::system(
        &state.pool,
        request.recipient_id,
        request.title,
        request.message,
        request.kind,
        request.priority,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
