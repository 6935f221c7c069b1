//! Singleton system settings.
//!
//! The first read persists a defaults row. Updates are sectioned: a missing
//! section, or a missing field inside one, leaves the stored value alone.

use std::time::Duration;

use entity::system_settings;
use platform_authn::PasswordPolicy;
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{HrResult, error::Violations, non_blank, now};

const SYSTEM_ACTOR: &str = "system";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub default_vacation_days: Option<i32>,
    pub currency: Option<String>,
    pub date_format: Option<String>,
    pub theme: Option<String>,
    pub timezone: Option<String>,
    pub notifications: Option<NotificationSettings>,
    pub backup: Option<BackupSettings>,
    pub security: Option<SecuritySettings>,
    pub email: Option<EmailSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: Option<bool>,
    pub new_employee_alerts: Option<bool>,
    pub salary_update_alerts: Option<bool>,
    pub system_maintenance: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    pub auto_backup: Option<bool>,
    pub backup_frequency: Option<String>,
    pub retention_period: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub password_min_length: Option<i32>,
    pub require_special_chars: Option<bool>,
    pub require_numbers: Option<bool>,
    pub require_uppercase: Option<bool>,
    pub session_timeout: Option<i32>,
    pub two_factor_required: Option<bool>,
    pub login_attempts: Option<i32>,
    pub lockout_duration: Option<i32>,
}

/// Incoming SMTP section. The password is write-only.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    #[serde(alias = "enableSSL")]
    pub enable_ssl: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailView {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub smtp_password_set: bool,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub enable_ssl: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub company_name: String,
    pub company_email: String,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub default_vacation_days: i32,
    pub currency: String,
    pub date_format: String,
    pub theme: String,
    pub timezone: String,
    pub notifications: NotificationSettings,
    pub backup: BackupSettings,
    pub security: SecuritySettings,
    pub email: EmailView,
    pub updated_by: String,
}

impl From<system_settings::Model> for SettingsView {
    fn from(m: system_settings::Model) -> Self {
        Self {
            notifications: NotificationSettings {
                email_notifications: Some(m.email_notifications),
                new_employee_alerts: Some(m.new_employee_alerts),
                salary_update_alerts: Some(m.salary_update_alerts),
                system_maintenance: Some(m.system_maintenance),
            },
            backup: BackupSettings {
                auto_backup: Some(m.auto_backup),
                backup_frequency: Some(m.backup_frequency),
                retention_period: Some(m.retention_period),
            },
            security: SecuritySettings {
                password_min_length: Some(m.password_min_length),
                require_special_chars: Some(m.require_special_chars),
                require_numbers: Some(m.require_numbers),
                require_uppercase: Some(m.require_uppercase),
                session_timeout: Some(m.session_timeout),
                two_factor_required: Some(m.two_factor_required),
                login_attempts: Some(m.login_attempts),
                lockout_duration: Some(m.lockout_duration),
            },
            email: EmailView {
                smtp_host: m.smtp_host,
                smtp_port: m.smtp_port,
                smtp_username: m.smtp_username,
                smtp_password_set: m.smtp_password.is_some_and(|p| !p.is_empty()),
                from_name: m.from_name,
                from_email: m.from_email,
                enable_ssl: m.enable_ssl,
            },
            company_name: m.company_name,
            company_email: m.company_email,
            company_phone: m.company_phone,
            company_address: m.company_address,
            default_vacation_days: m.default_vacation_days,
            currency: m.currency,
            date_format: m.date_format,
            theme: m.theme,
            timezone: m.timezone,
            updated_by: m.updated_by,
        }
    }
}

/// Envelope returned by every settings operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SettingsView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTimeWithTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SettingsResponse {
    fn with(model: system_settings::Model, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            last_updated: Some(model.updated_at),
            data: Some(model.into()),
            reference: None,
        }
    }

    fn ack(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
            last_updated: None,
            reference: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: String,
}

fn defaults(actor: &str) -> system_settings::ActiveModel {
    let now = now();
    system_settings::ActiveModel {
        company_name: Set("Employee Management System".into()),
        company_email: Set("admin@ems.com".into()),
        company_phone: Set(Some("+1 (555) 123-4567".into())),
        company_address: Set(Some("123 Business Ave, Tech City, TC 12345".into())),
        default_vacation_days: Set(20),
        currency: Set("USD".into()),
        date_format: Set("MM/DD/YYYY".into()),
        theme: Set("light".into()),
        timezone: Set("America/New_York".into()),
        email_notifications: Set(true),
        new_employee_alerts: Set(true),
        salary_update_alerts: Set(false),
        system_maintenance: Set(true),
        auto_backup: Set(true),
        backup_frequency: Set("weekly".into()),
        retention_period: Set(30),
        password_min_length: Set(8),
        require_special_chars: Set(true),
        require_numbers: Set(true),
        require_uppercase: Set(true),
        session_timeout: Set(30),
        two_factor_required: Set(false),
        login_attempts: Set(5),
        lockout_duration: Set(15),
        smtp_host: Set(Some("smtp.gmail.com".into())),
        smtp_port: Set(Some(587)),
        smtp_username: Set(Some("noreply@ems.com".into())),
        smtp_password: Set(None),
        from_name: Set(Some("EMS HR".into())),
        from_email: Set(Some("hr@ems.com".into())),
        enable_ssl: Set(true),
        created_by: Set(actor.to_string()),
        updated_by: Set(actor.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Current row, creating the defaults on first use.
pub(crate) async fn current(db: &DbPool) -> HrResult<(system_settings::Model, bool)> {
    let existing = system_settings::Entity::find()
        .order_by_desc(system_settings::Column::UpdatedAt)
        .one(db)
        .await?;
    match existing {
        Some(model) => Ok((model, false)),
        None => {
            let model = defaults(SYSTEM_ACTOR).insert(db).await?;
            info!("default system settings created");
            Ok((model, true))
        }
    }
}

pub async fn get(db: &DbPool) -> HrResult<SettingsResponse> {
    let (model, created) = current(db).await?;
    let message = if created {
        "Default settings created"
    } else {
        "Settings retrieved successfully"
    };
    Ok(SettingsResponse::with(model, message))
}

/// Password rules currently in force.
pub async fn password_policy(db: &DbPool) -> HrResult<PasswordPolicy> {
    let (model, _) = current(db).await?;
    Ok(PasswordPolicy {
        min_length: usize::try_from(model.password_min_length).unwrap_or(8),
        require_special_chars: model.require_special_chars,
        require_numbers: model.require_numbers,
        require_uppercase: model.require_uppercase,
    })
}

fn validate(request: &SettingsRequest) -> HrResult<()> {
    let mut v = Violations::new();
    if let Some(name) = request.company_name.as_deref() {
        let len = name.trim().chars().count();
        v.check((2..=255).contains(&len), "companyName", "companyName must be between 2 and 255 characters");
    }
    if let Some(email) = request.company_email.as_deref() {
        v.required(email, "companyEmail");
        v.max_len(Some(email), 255, "companyEmail");
    }
    v.max_len(request.company_phone.as_deref(), 64, "companyPhone");
    v.in_range(request.default_vacation_days, 0, 365, "defaultVacationDays");
    v.max_len(request.currency.as_deref(), 8, "currency");
    if let Some(backup) = &request.backup {
        v.in_range(backup.retention_period, 1, 365, "backup.retentionPeriod");
    }
    if let Some(security) = &request.security {
        v.in_range(security.password_min_length, 6, 20, "security.passwordMinLength");
        v.in_range(security.session_timeout, 5, 120, "security.sessionTimeout");
        v.in_range(security.login_attempts, 3, 10, "security.loginAttempts");
        v.in_range(security.lockout_duration, 5, 60, "security.lockoutDuration");
    }
    if let Some(email) = &request.email {
        v.in_range(email.smtp_port, 1, 65535, "email.smtpPort");
    }
    v.finish()
}

fn set<T>(field: &mut sea_orm::ActiveValue<T>, value: Option<T>)
where
    T: Into<sea_orm::Value>,
{
    if let Some(value) = value {
        *field = Set(value);
    }
}

fn set_text(field: &mut sea_orm::ActiveValue<Option<String>>, value: Option<String>) {
    if value.is_some() {
        *field = Set(non_blank(value));
    }
}

#[instrument(name = "hr.settings.update", skip(db, request))]
pub async fn update(db: &DbPool, request: SettingsRequest, updated_by: &str) -> HrResult<SettingsResponse> {
    validate(&request)?;
    let (model, _) = current(db).await?;
    let mut a = model.into_active_model();

    set(&mut a.company_name, request.company_name.map(|n| n.trim().to_string()));
    set(&mut a.company_email, request.company_email.map(|e| e.trim().to_string()));
    set_text(&mut a.company_phone, request.company_phone);
    set_text(&mut a.company_address, request.company_address);
    set(&mut a.default_vacation_days, request.default_vacation_days);
    set(&mut a.currency, request.currency);
    set(&mut a.date_format, request.date_format);
    set(&mut a.theme, request.theme);
    set(&mut a.timezone, request.timezone);

    if let Some(n) = request.notifications {
        set(&mut a.email_notifications, n.email_notifications);
        set(&mut a.new_employee_alerts, n.new_employee_alerts);
        set(&mut a.salary_update_alerts, n.salary_update_alerts);
        set(&mut a.system_maintenance, n.system_maintenance);
    }
    if let Some(b) = request.backup {
        set(&mut a.auto_backup, b.auto_backup);
        set(&mut a.backup_frequency, b.backup_frequency);
        set(&mut a.retention_period, b.retention_period);
    }
    if let Some(s) = request.security {
        set(&mut a.password_min_length, s.password_min_length);
        set(&mut a.require_special_chars, s.require_special_chars);
        set(&mut a.require_numbers, s.require_numbers);
        set(&mut a.require_uppercase, s.require_uppercase);
        set(&mut a.session_timeout, s.session_timeout);
        set(&mut a.two_factor_required, s.two_factor_required);
        set(&mut a.login_attempts, s.login_attempts);
        set(&mut a.lockout_duration, s.lockout_duration);
    }
    if let Some(e) = request.email {
        set_text(&mut a.smtp_host, e.smtp_host);
        set(&mut a.smtp_port, e.smtp_port.map(Some));
        set_text(&mut a.smtp_username, e.smtp_username);
        set_text(&mut a.smtp_password, e.smtp_password);
        set_text(&mut a.from_name, e.from_name);
        set_text(&mut a.from_email, e.from_email);
        set(&mut a.enable_ssl, e.enable_ssl);
    }
    a.updated_by = Set(updated_by.to_string());
    a.updated_at = Set(now());
    let model = a.update(db).await?;
    info!(updated_by, "system settings updated");
    Ok(SettingsResponse::with(model, "Settings updated successfully"))
}

#[instrument(name = "hr.settings.reset", skip(db))]
pub async fn reset(db: &DbPool, updated_by: &str) -> HrResult<SettingsResponse> {
    system_settings::Entity::delete_many().exec(db).await?;
    let model = defaults(updated_by).insert(db).await?;
    info!(updated_by, "system settings reset to defaults");
    Ok(SettingsResponse::with(model, "Settings reset to defaults successfully"))
}

/// Logs the attempt; no mail transport is wired in.
pub async fn send_test_email(db: &DbPool, recipient: &str) -> HrResult<SettingsResponse> {
    let mut v = Violations::new();
    v.check(recipient.contains('@'), "testEmail", "testEmail must be a valid address");
    v.finish()?;
    let (model, _) = current(db).await?;
    info!(
        recipient,
        from = model.from_email.as_deref().unwrap_or_default(),
        host = model.smtp_host.as_deref().unwrap_or_default(),
        "test email requested"
    );
    Ok(SettingsResponse::ack("Test email sent successfully"))
}

/// Records a manual backup request and hands back its reference.
pub fn backup() -> SettingsResponse {
    let reference = Uuid::new_v4().to_string();
    info!(%reference, "manual backup initiated");
    SettingsResponse {
        reference: Some(reference),
        ..SettingsResponse::ack("Backup created successfully")
    }
}

pub fn clear_cache() -> SettingsResponse {
    info!("system cache cleared");
    SettingsResponse::ack("Cache cleared successfully")
}

pub fn system_info(db: &DbPool, uptime: Duration) -> SystemInfo {
    SystemInfo {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime.as_secs(),
        database: format!("{:?}", db.get_database_backend()),
    }
}
