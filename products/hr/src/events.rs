//! Notifications raised as a side effect of other operations.
//!
//! Delivery is best effort: a failure is logged and never fails the
//! operation that triggered it.

use entity::{
    notifications::{NotificationKind, NotificationPriority},
    users,
};
use platform_authz::Role;
use platform_db::DbPool;
use tracing::{error, info};

use crate::{
    employees::EmployeeResponse,
    notifications::{self, Notice},
};

/// Roles told about every new hire.
const NEW_HIRE_AUDIENCE: [Role; 3] = [Role::Manager, Role::DepartmentHead, Role::Hr];

pub(crate) async fn welcome(db: &DbPool, user: &users::Model) {
    let message = format!(
        "Hello {}, welcome to our organization! Your account has been successfully created. \
         Please update your profile information and familiarize yourself with the system.",
        user.username
    );
    match notifications::system(
        db,
        user.id,
        "Welcome to the Employee Management System!",
        message,
        Some(NotificationKind::Success),
        Some(NotificationPriority::Normal),
    )
    .await
    {
        Ok(_) => info!(user = %user.username, "welcome notification sent"),
        Err(err) => error!(user = %user.username, error = %err, "failed to send welcome notification"),
    }
}

pub(crate) async fn role_changed(db: &DbPool, user: &users::Model, from: Role, to: Role, changed_by: &str) {
    let message = format!(
        "Your role has been changed from {from} to {to} by {changed_by}. \
         Your new permissions and access levels are now active."
    );
    match notifications::system(
        db,
        user.id,
        "Role Updated",
        message,
        Some(NotificationKind::Warning),
        Some(NotificationPriority::High),
    )
    .await
    {
        Ok(_) => info!(user = %user.username, %from, %to, "role change notification sent"),
        Err(err) => error!(user = %user.username, error = %err, "failed to send role change notification"),
    }
}

pub(crate) async fn new_employee(db: &DbPool, employee: &EmployeeResponse) {
    let notice = Notice::new(
        "New Employee Added",
        format!(
            "A new employee {} {} (ID: {}) has been added to the {} department.",
            employee.first_name,
            employee.last_name,
            employee.employee_code,
            employee.department.as_deref().unwrap_or("N/A"),
        ),
    )
    .kind(NotificationKind::Info);
    let mut sent = 0;
    for role in NEW_HIRE_AUDIENCE {
        match notifications::send_to_role(db, role, &notice, None).await {
            Ok(count) => sent += count,
            Err(err) => error!(%role, error = %err, "failed to send new employee notifications"),
        }
    }
    info!(code = %employee.employee_code, sent, "new employee notifications sent");
}

pub(crate) async fn head_assigned(db: &DbPool, user_id: i32, department: &str, assigned_by: Option<i32>) {
    let notice = Notice::new(
        "Department Head Assignment",
        format!("You have been assigned as head of the {department} department."),
    )
    .kind(NotificationKind::DepartmentUpdate)
    .priority(NotificationPriority::High);
    if notifications::bulk(db, &[user_id], &notice, assigned_by).await == 0 {
        error!(user_id, department, "failed to send department head notification");
    }
}
