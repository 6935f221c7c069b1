use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub recipient_id: i32,
    pub sender_id: Option<i32>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
}

impl Model {
    pub fn is_expired_at(&self, now: DateTimeWithTimeZone) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::RecipientId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SenderId",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    Sender,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    #[sea_orm(string_value = "INFO")]
    Info,
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "WARNING")]
    Warning,
    #[sea_orm(string_value = "ERROR")]
    Error,
    #[sea_orm(string_value = "SYSTEM")]
    System,
    #[sea_orm(string_value = "EMPLOYEE_UPDATE")]
    EmployeeUpdate,
    #[sea_orm(string_value = "DEPARTMENT_UPDATE")]
    DepartmentUpdate,
    #[sea_orm(string_value = "ROLE_CHANGE")]
    RoleChange,
    #[sea_orm(string_value = "LEAVE_REQUEST")]
    LeaveRequest,
    #[sea_orm(string_value = "PAYROLL")]
    Payroll,
    #[sea_orm(string_value = "BIRTHDAY")]
    Birthday,
    #[sea_orm(string_value = "ANNIVERSARY")]
    Anniversary,
    #[sea_orm(string_value = "TASK_ASSIGNMENT")]
    TaskAssignment,
    #[sea_orm(string_value = "MEETING_REMINDER")]
    MeetingReminder,
    #[sea_orm(string_value = "DEADLINE_REMINDER")]
    DeadlineReminder,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "NORMAL")]
    Normal,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

impl ActiveModelBehavior for ActiveModel {}
