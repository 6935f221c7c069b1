use sea_orm::entity::prelude::*;

/// Singleton settings row. Integer ranges are enforced by the settings
/// service before anything is written.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub company_name: String,
    pub company_email: String,
    pub company_phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub company_address: Option<String>,
    pub default_vacation_days: i32,
    pub currency: String,
    pub date_format: String,
    pub theme: String,
    pub timezone: String,
    pub email_notifications: bool,
    pub new_employee_alerts: bool,
    pub salary_update_alerts: bool,
    pub system_maintenance: bool,
    pub auto_backup: bool,
    pub backup_frequency: String,
    pub retention_period: i32,
    pub password_min_length: i32,
    pub require_special_chars: bool,
    pub require_numbers: bool,
    pub require_uppercase: bool,
    pub session_timeout: i32,
    pub two_factor_required: bool,
    pub login_attempts: i32,
    pub lockout_duration: i32,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub enable_ssl: bool,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
