//! Per-user notifications.
//!
//! Every read or mutation of a single notification is scoped to its
//! recipient: callers pass their own user id and anything addressed to
//! someone else is refused.

use std::collections::{BTreeSet, HashMap};

use chrono::Duration;
use entity::{
    notifications::{self, NotificationKind, NotificationPriority},
    users,
};
use platform_authz::Role;
use platform_db::{DbPool, EqFilter, FilterSet, Page, PageRequest, fetch_page};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    prelude::{DateTimeWithTimeZone, Expr},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{HrError, HrResult, error::Violations, non_blank, now};

/// Read notifications older than this are purged by [`cleanup_old_read`].
pub const READ_RETENTION_DAYS: i64 = 30;
const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_LIMIT: u64 = 5;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub recipient_id: i32,
    pub sender_id: Option<i32>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
    pub priority: Option<NotificationPriority>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
}

/// Content shared by fan-out sends.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    #[serde(default = "default_priority")]
    pub priority: NotificationPriority,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

fn default_priority() -> NotificationPriority {
    NotificationPriority::Normal
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: default_kind(),
            priority: default_priority(),
        }
    }

    pub fn kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    fn to(&self, recipient_id: i32, sender_id: Option<i32>) -> NotificationRequest {
        NotificationRequest {
            recipient_id,
            sender_id,
            title: self.title.clone(),
            message: self.message.clone(),
            kind: Some(self.kind),
            priority: Some(self.priority),
            expires_at: None,
            action_url: None,
            action_label: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i32,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub is_expired: bool,
}

impl NotificationResponse {
    fn from_model(model: notifications::Model, names: &HashMap<i32, String>) -> Self {
        Self {
            is_expired: model.is_expired_at(now()),
            recipient_name: names.get(&model.recipient_id).cloned(),
            sender_name: model.sender_id.and_then(|id| names.get(&id).cloned()),
            id: model.id,
            title: model.title,
            message: model.message,
            kind: model.kind,
            priority: model.priority,
            is_read: model.is_read,
            read_at: model.read_at,
            created_at: model.created_at,
            expires_at: model.expires_at,
            action_url: model.action_url,
            action_label: model.action_label,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    pub total_notifications: u64,
    pub unread_count: u64,
    pub high_priority_unread_count: u64,
    pub urgent_priority_unread_count: u64,
    pub recent_notifications: Vec<NotificationResponse>,
}

/// Optional criteria for the filtered inbox. Expired notifications never match.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
    pub priority: Option<NotificationPriority>,
}

impl NotificationFilter {
    fn to_filter_set(&self, recipient_id: i32, at: DateTimeWithTimeZone) -> FilterSet {
        use notifications::Column;
        FilterSet::new()
            .eq(Column::RecipientId, EqFilter::new(Some(recipient_id)))
            .eq(Column::IsRead, EqFilter::new(self.is_read))
            .eq(Column::Kind, EqFilter::new(self.kind))
            .eq(Column::Priority, EqFilter::new(self.priority))
            .push(Some(Column::ExpiresAt.is_null().or(Column::ExpiresAt.gt(at))))
    }
}

async fn user_names(db: &DbPool, ids: BTreeSet<i32>) -> HrResult<HashMap<i32, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

fn involved(models: &[notifications::Model]) -> BTreeSet<i32> {
    models
        .iter()
        .flat_map(|m| std::iter::once(m.recipient_id).chain(m.sender_id))
        .collect()
}

async fn respond_all(db: &DbPool, models: Vec<notifications::Model>) -> HrResult<Vec<NotificationResponse>> {
    let names = user_names(db, involved(&models)).await?;
    Ok(models
        .into_iter()
        .map(|m| NotificationResponse::from_model(m, &names))
        .collect())
}

async fn respond(db: &DbPool, model: notifications::Model) -> HrResult<NotificationResponse> {
    let mut all = respond_all(db, vec![model]).await?;
    all.pop()
        .ok_or_else(|| HrError::Conflict("notification vanished while loading".into()))
}

async fn require_user(db: &DbPool, id: i32, entity: &'static str) -> HrResult<users::Model> {
    users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found(entity, id))
}

async fn owned(db: &DbPool, id: i32, user_id: i32, action: &str) -> HrResult<notifications::Model> {
    let model = notifications::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("Notification", id))?;
    if model.recipient_id != user_id {
        return Err(HrError::Forbidden(format!(
            "User can only {action} their own notifications"
        )));
    }
    Ok(model)
}

fn validate(request: &NotificationRequest) -> HrResult<()> {
    let mut v = Violations::new();
    v.required(&request.title, "title");
    v.required(&request.message, "message");
    v.max_len(Some(&request.title), 200, "title");
    v.max_len(Some(&request.message), 1000, "message");
    v.max_len(request.action_url.as_deref(), 100, "actionUrl");
    v.max_len(request.action_label.as_deref(), 50, "actionLabel");
    v.finish()
}

#[instrument(name = "hr.notifications.create", skip_all, fields(recipient_id = request.recipient_id))]
pub async fn create(db: &DbPool, request: NotificationRequest) -> HrResult<NotificationResponse> {
    validate(&request)?;
    let recipient = require_user(db, request.recipient_id, "Recipient").await?;
    if let Some(sender_id) = request.sender_id {
        require_user(db, sender_id, "Sender").await?;
    }
    let model = notifications::ActiveModel {
        recipient_id: Set(recipient.id),
        sender_id: Set(request.sender_id),
        title: Set(request.title.trim().to_string()),
        message: Set(request.message.trim().to_string()),
        kind: Set(request.kind.unwrap_or(NotificationKind::Info)),
        priority: Set(request.priority.unwrap_or(NotificationPriority::Normal)),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(now()),
        expires_at: Set(request.expires_at),
        action_url: Set(non_blank(request.action_url)),
        action_label: Set(non_blank(request.action_label)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(notification_id = model.id, recipient = %recipient.username, "notification created");
    respond(db, model).await
}

/// Sends `notice` to each recipient. Failures are logged and skipped; the
/// number actually delivered is returned.
pub async fn bulk(db: &DbPool, recipients: &[i32], notice: &Notice, sender_id: Option<i32>) -> usize {
    let mut sent = 0;
    for &recipient_id in recipients {
        match create(db, notice.to(recipient_id, sender_id)).await {
            Ok(_) => sent += 1,
            Err(err) => error!(recipient_id, error = %err, "failed to send notification"),
        }
    }
    sent
}

/// Fans `notice` out to every account holding `role`.
#[instrument(name = "hr.notifications.send_to_role", skip(db, notice), fields(role = %role))]
pub async fn send_to_role(
    db: &DbPool,
    role: Role,
    notice: &Notice,
    sender_id: Option<i32>,
) -> HrResult<usize> {
    let recipients: Vec<i32> = users::Entity::find()
        .select_only()
        .column(users::Column::Id)
        .filter(users::Column::Role.eq(role.as_str()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(bulk(db, &recipients, notice, sender_id).await)
}

/// Sender-less notification; the kind defaults to SYSTEM.
pub async fn system(
    db: &DbPool,
    recipient_id: i32,
    title: impl Into<String>,
    message: impl Into<String>,
    kind: Option<NotificationKind>,
    priority: Option<NotificationPriority>,
) -> HrResult<NotificationResponse> {
    create(
        db,
        NotificationRequest {
            recipient_id,
            sender_id: None,
            title: title.into(),
            message: message.into(),
            kind: Some(kind.unwrap_or(NotificationKind::System)),
            priority,
            expires_at: None,
            action_url: None,
            action_label: None,
        },
    )
    .await
}

/// Newest first.
pub async fn list_for_user(
    db: &DbPool,
    user_id: i32,
    page: PageRequest,
) -> HrResult<Page<NotificationResponse>> {
    require_user(db, user_id, "User").await?;
    let select = notifications::Entity::find()
        .filter(notifications::Column::RecipientId.eq(user_id))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id);
    let page = fetch_page(db, select, page).await?;
    let names = user_names(db, involved(&page.content)).await?;
    Ok(page.map(|m| NotificationResponse::from_model(m, &names)))
}

pub async fn unread(db: &DbPool, user_id: i32) -> HrResult<Vec<NotificationResponse>> {
    require_user(db, user_id, "User").await?;
    let models = notifications::Entity::find()
        .filter(notifications::Column::RecipientId.eq(user_id))
        .filter(notifications::Column::IsRead.eq(false))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .all(db)
        .await?;
    respond_all(db, models).await
}

pub async fn summary(db: &DbPool, user_id: i32) -> HrResult<NotificationSummary> {
    require_user(db, user_id, "User").await?;
    let mine = || notifications::Entity::find().filter(notifications::Column::RecipientId.eq(user_id));
    let unread = || mine().filter(notifications::Column::IsRead.eq(false));

    let total_notifications = mine().count(db).await?;
    let unread_count = unread().count(db).await?;
    let high_priority_unread_count = unread()
        .filter(notifications::Column::Priority.eq(NotificationPriority::High))
        .count(db)
        .await?;
    let urgent_priority_unread_count = unread()
        .filter(notifications::Column::Priority.eq(NotificationPriority::Urgent))
        .count(db)
        .await?;
    let since = now() - Duration::days(RECENT_WINDOW_DAYS);
    let recent = mine()
        .filter(notifications::Column::CreatedAt.gte(since))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .limit(RECENT_LIMIT)
        .all(db)
        .await?;

    Ok(NotificationSummary {
        total_notifications,
        unread_count,
        high_priority_unread_count,
        urgent_priority_unread_count,
        recent_notifications: respond_all(db, recent).await?,
    })
}

pub async fn get(db: &DbPool, id: i32, user_id: i32) -> HrResult<NotificationResponse> {
    let model = owned(db, id, user_id, "access").await?;
    respond(db, model).await
}

/// Idempotent: a notification already read keeps its first `read_at`.
pub async fn mark_read(db: &DbPool, id: i32, user_id: i32) -> HrResult<NotificationResponse> {
    let model = owned(db, id, user_id, "mark").await?;
    if model.is_read {
        return respond(db, model).await;
    }
    let mut active = model.into_active_model();
    active.is_read = Set(true);
    active.read_at = Set(Some(now()));
    let model = active.update(db).await?;
    info!(notification_id = id, user_id, "notification marked read");
    respond(db, model).await
}

pub async fn mark_all_read(db: &DbPool, user_id: i32) -> HrResult<u64> {
    require_user(db, user_id, "User").await?;
    let result = notifications::Entity::update_many()
        .col_expr(notifications::Column::IsRead, Expr::value(true))
        .col_expr(notifications::Column::ReadAt, Expr::value(now()))
        .filter(notifications::Column::RecipientId.eq(user_id))
        .filter(notifications::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    info!(user_id, updated = result.rows_affected, "notifications marked read");
    Ok(result.rows_affected)
}

pub async fn delete(db: &DbPool, id: i32, user_id: i32) -> HrResult<()> {
    let model = owned(db, id, user_id, "delete").await?;
    notifications::Entity::delete_by_id(model.id).exec(db).await?;
    info!(notification_id = id, user_id, "notification deleted");
    Ok(())
}

pub async fn filtered(
    db: &DbPool,
    user_id: i32,
    filter: &NotificationFilter,
    page: PageRequest,
) -> HrResult<Page<NotificationResponse>> {
    require_user(db, user_id, "User").await?;
    let select = filter
        .to_filter_set(user_id, now())
        .apply(notifications::Entity::find())
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id);
    let page = fetch_page(db, select, page).await?;
    let names = user_names(db, involved(&page.content)).await?;
    Ok(page.map(|m| NotificationResponse::from_model(m, &names)))
}

pub async fn cleanup_expired(db: &DbPool, at: DateTimeWithTimeZone) -> HrResult<u64> {
    let result = notifications::Entity::delete_many()
        .filter(notifications::Column::ExpiresAt.lt(at))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(deleted = result.rows_affected, "expired notifications cleaned up");
    }
    Ok(result.rows_affected)
}

pub async fn cleanup_old_read(db: &DbPool, at: DateTimeWithTimeZone) -> HrResult<u64> {
    let cutoff = at - Duration::days(READ_RETENTION_DAYS);
    let result = notifications::Entity::delete_many()
        .filter(notifications::Column::IsRead.eq(true))
        .filter(notifications::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    info!(deleted = result.rows_affected, "old read notifications cleaned up");
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_user, setup_db};

    fn to(recipient_id: i32, title: &str) -> NotificationRequest {
        Notice::new(title, "body").to(recipient_id, None)
    }

    #[tokio::test]
    async fn create_requires_existing_parties() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        assert!(matches!(
            create(&db, to(99, "hi")).await,
            Err(HrError::NotFound { entity: "Recipient", .. })
        ));
        let mut from_ghost = to(alice.id, "hi");
        from_ghost.sender_id = Some(77);
        assert!(matches!(
            create(&db, from_ghost).await,
            Err(HrError::NotFound { entity: "Sender", .. })
        ));

        let created = create(&db, to(alice.id, "hi")).await.unwrap();
        assert_eq!(created.kind, NotificationKind::Info);
        assert_eq!(created.priority, NotificationPriority::Normal);
        assert_eq!(created.recipient_name.as_deref(), Some("alice"));
        assert!(!created.is_read);
    }

    #[tokio::test]
    async fn only_the_recipient_may_touch_a_notification() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        let bob = insert_user(&db, "bob", Role::Employee).await;
        let note = create(&db, to(alice.id, "private")).await.unwrap();

        assert!(matches!(get(&db, note.id, bob.id).await, Err(HrError::Forbidden(_))));
        assert!(matches!(mark_read(&db, note.id, bob.id).await, Err(HrError::Forbidden(_))));
        assert!(matches!(delete(&db, note.id, bob.id).await, Err(HrError::Forbidden(_))));

        let first = mark_read(&db, note.id, alice.id).await.unwrap();
        let again = mark_read(&db, note.id, alice.id).await.unwrap();
        assert!(first.is_read);
        assert_eq!(first.read_at, again.read_at);

        delete(&db, note.id, alice.id).await.unwrap();
        assert!(matches!(get(&db, note.id, alice.id).await, Err(HrError::NotFound { .. })));
    }

    #[tokio::test]
    async fn summary_counts_unread_by_priority() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        let high = Notice::new("h", "m").priority(NotificationPriority::High);
        let urgent = Notice::new("u", "m").priority(NotificationPriority::Urgent);
        bulk(&db, &[alice.id, alice.id], &high, None).await;
        bulk(&db, &[alice.id], &urgent, None).await;
        let normal = create(&db, to(alice.id, "n")).await.unwrap();
        for n in 0..4 {
            create(&db, to(alice.id, &format!("extra {n}"))).await.unwrap();
        }
        mark_read(&db, normal.id, alice.id).await.unwrap();

        let s = summary(&db, alice.id).await.unwrap();
        assert_eq!(s.total_notifications, 8);
        assert_eq!(s.unread_count, 7);
        assert_eq!(s.high_priority_unread_count, 2);
        assert_eq!(s.urgent_priority_unread_count, 1);
        assert_eq!(s.recent_notifications.len(), 5);

        assert_eq!(unread(&db, alice.id).await.unwrap().len(), 7);
        assert_eq!(mark_all_read(&db, alice.id).await.unwrap(), 7);
        assert_eq!(summary(&db, alice.id).await.unwrap().unread_count, 0);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paged() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        for n in 0..3 {
            create(&db, to(alice.id, &format!("n{n}"))).await.unwrap();
        }
        let page = list_for_user(&db, alice.id, PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.content[0].title, "n2");
        assert_eq!(page.content[1].title, "n1");
        assert!(matches!(
            list_for_user(&db, 404, PageRequest::default()).await,
            Err(HrError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn filtered_view_hides_expired() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        let mut stale = to(alice.id, "stale");
        stale.expires_at = Some(now() - Duration::hours(1));
        create(&db, stale).await.unwrap();
        let mut fresh = to(alice.id, "fresh");
        fresh.expires_at = Some(now() + Duration::hours(1));
        fresh.kind = Some(NotificationKind::Payroll);
        create(&db, fresh).await.unwrap();
        create(&db, to(alice.id, "plain")).await.unwrap();

        let all = filtered(&db, alice.id, &NotificationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total_elements, 2);
        assert!(all.content.iter().all(|n| !n.is_expired));

        let payroll = NotificationFilter {
            kind: Some(NotificationKind::Payroll),
            is_read: Some(false),
            ..Default::default()
        };
        let hits = filtered(&db, alice.id, &payroll, PageRequest::default()).await.unwrap();
        assert_eq!(hits.total_elements, 1);
        assert_eq!(hits.content[0].title, "fresh");

        assert_eq!(cleanup_expired(&db, now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn role_fan_out_and_system_notices() {
        let db = setup_db().await;
        let hr_one = insert_user(&db, "hr1", Role::Hr).await;
        insert_user(&db, "hr2", Role::Hr).await;
        insert_user(&db, "emp", Role::Employee).await;
        let sent = send_to_role(&db, Role::Hr, &Notice::new("Policy", "Read it"), None)
            .await
            .unwrap();
        assert_eq!(sent, 2);

        let notice = system(&db, hr_one.id, "Maintenance", "Tonight", None, None)
            .await
            .unwrap();
        assert_eq!(notice.kind, NotificationKind::System);
        assert_eq!(notice.sender_name, None);

        assert_eq!(bulk(&db, &[hr_one.id, 999], &Notice::new("x", "y"), None).await, 1);
    }

    #[tokio::test]
    async fn old_read_notifications_are_purged() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", Role::Employee).await;
        let note = create(&db, to(alice.id, "old")).await.unwrap();
        mark_read(&db, note.id, alice.id).await.unwrap();
        create(&db, to(alice.id, "unread")).await.unwrap();

        assert_eq!(cleanup_old_read(&db, now()).await.unwrap(), 0);
        let later = now() + Duration::days(READ_RETENTION_DAYS + 1);
        assert_eq!(cleanup_old_read(&db, later).await.unwrap(), 1);
        assert_eq!(summary(&db, alice.id).await.unwrap().total_notifications, 1);
    }
}
