//! Accounts, credentials and role administration.

use chrono::Utc;
use entity::{employees, users};
use platform_authn::{hash_password, verify_password};
use platform_authz::{AuthzError, Capability, Role, includes};
use platform_db::DbPool;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    HrError, HrResult,
    employees::{self as employee_service, EmployeeRequest},
    error::Violations,
    events, non_blank, now, settings,
};

const DEFAULT_POSITION: &str = "New Employee";
const OWNER_CODE: &str = "EMS000";

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// "First Last"; split on the first space.
    pub name: Option<String>,
    #[serde(alias = "employeeId")]
    pub employee_code: Option<String>,
    pub department: Option<String>,
}

/// Profile returned by login, registration and `me`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub status: &'static str,
    pub id: i32,
    pub username: String,
    pub email: String,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub role: Role,
    pub capabilities: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTimeWithTimeZone,
    pub last_login: Option<DateTimeWithTimeZone>,
}

impl UserSummary {
    fn from_model(model: users::Model) -> HrResult<Self> {
        Ok(Self {
            role: model.role.parse()?,
            id: model.id,
            username: model.username,
            email: model.email,
            enabled: model.enabled,
            created_at: model.created_at,
            last_login: model.last_login,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    pub role: Role,
    pub display_name: &'static str,
    pub count: u64,
}

/// Head counts and payroll total for dashboards. What a caller cannot see
/// in [`list`] is left out of the visible figures and reported only as
/// `hidden_accounts`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: u64,
    pub visible_users: u64,
    pub hidden_accounts: u64,
    pub admin_count: u64,
    pub total_employees: u64,
    pub visible_employees: u64,
    /// Sum of visible employees' salaries; missing salaries count as zero.
    pub total_salary: Decimal,
}

/// Credentials for the initial SUPER_ADMIN account.
#[derive(Clone, Debug)]
pub struct OwnerSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

async fn profile(db: &DbPool, user: users::Model) -> HrResult<AuthResponse> {
    let role: Role = user.role.parse()?;
    let employee = employee_service::find_by_user(db, user.id).await?;
    Ok(AuthResponse {
        status: "authenticated",
        id: user.id,
        username: user.username,
        email: user.email,
        employee_code: employee.as_ref().map(|e| e.employee_code.clone()),
        department: employee.and_then(|e| e.department),
        capabilities: platform_authz::authorities(role),
        role,
    })
}

async fn find_by_email(db: &DbPool, email: &str) -> HrResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(email.trim()))
        .one(db)
        .await?)
}

/// Unknown email and wrong password are indistinguishable to the caller.
#[instrument(name = "hr.users.login", skip_all)]
pub async fn login(db: &DbPool, request: LoginRequest) -> HrResult<AuthResponse> {
    let Some(user) = find_by_email(db, &request.email).await? else {
        warn!("login for unknown email");
        return Err(HrError::InvalidCredentials);
    };
    match verify_password(&request.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = user.id, "login with wrong password");
            return Err(HrError::InvalidCredentials);
        }
        Err(err) => {
            warn!(user_id = user.id, error = %err, "stored credentials unusable");
            return Err(HrError::InvalidCredentials);
        }
    }
    if !user.enabled {
        return Err(HrError::AccountDisabled);
    }
    let mut active = user.into_active_model();
    active.last_login = Set(Some(now()));
    let user = active.update(db).await?;
    info!(user_id = user.id, "user logged in");
    profile(db, user).await
}

fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

fn validate_registration(request: &RegisterRequest) -> HrResult<()> {
    let mut v = Violations::new();
    v.required(&request.email, "email");
    v.check(request.email.contains('@'), "email", "email must be a valid address");
    v.max_len(Some(&request.email), 50, "email");
    let wants_profile = request.name.is_some() || request.employee_code.is_some();
    if wants_profile {
        let (first, last) = split_name(request.name.as_deref().unwrap_or_default());
        v.check(
            !first.is_empty() && !last.is_empty(),
            "name",
            "name must contain a first and a last name",
        );
    }
    v.finish()
}

#[instrument(name = "hr.users.register", skip_all)]
pub async fn register(db: &DbPool, request: RegisterRequest) -> HrResult<AuthResponse> {
    validate_registration(&request)?;
    let email = request.email.trim().to_string();
    if find_by_email(db, &email).await?.is_some() {
        return Err(HrError::Duplicate("Email is already in use".into()));
    }
    settings::password_policy(db).await?.check(&request.password)?;

    let password_hash = hash_password(&request.password)?;

    // Account and profile land together or not at all.
    let txn = db.begin().await?;
    let now = now();
    let user = users::ActiveModel {
        username: Set(email.clone()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(Role::Employee.as_str().to_string()),
        enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let employee = if request.name.is_some() || request.employee_code.is_some() {
        let (first_name, last_name) = split_name(request.name.as_deref().unwrap_or_default());
        let created = employee_service::insert(
            &txn,
            EmployeeRequest {
                first_name,
                last_name,
                employee_code: non_blank(request.employee_code),
                department: request.department,
                position: Some(DEFAULT_POSITION.into()),
                hire_date: Some(Utc::now().date_naive()),
                email: Some(user.email.clone()),
                user_id: Some(user.id),
                ..Default::default()
            },
        )
        .await?;
        Some(created)
    } else {
        None
    };
    txn.commit().await?;
    info!(user_id = user.id, "user registered");

    if let Some(employee) = &employee {
        events::new_employee(db, employee).await;
    }
    events::welcome(db, &user).await;
    profile(db, user).await
}

pub async fn me(db: &DbPool, user_id: i32) -> HrResult<AuthResponse> {
    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("User", user_id))?;
    profile(db, user).await
}

/// Loads the account behind a request. Missing accounts are treated as bad
/// credentials; an unrecognised stored role is an error, never a default.
pub async fn resolve_caller(db: &DbPool, user_id: i32) -> HrResult<(users::Model, Role)> {
    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(HrError::InvalidCredentials)?;
    if !user.enabled {
        return Err(HrError::AccountDisabled);
    }
    let role = user.role.parse()?;
    Ok((user, role))
}

/// SUPER_ADMIN accounts are only visible to callers holding SUPER_ADMIN_ACCESS.
pub async fn list(db: &DbPool, viewer: Role) -> HrResult<Vec<UserSummary>> {
    let mut query = users::Entity::find().order_by_asc(users::Column::Id);
    if !viewer.has(Capability::SuperAdminAccess) {
        query = query.filter(users::Column::Role.ne(Role::SuperAdmin.as_str()));
    }
    query
        .all(db)
        .await?
        .into_iter()
        .map(UserSummary::from_model)
        .collect()
}

fn may_grant(caller: Role, role: Role) -> bool {
    caller.has(Capability::SuperAdminAccess) || includes(caller, role)
}

fn guard(caller: Role, required: Role) -> HrResult<()> {
    if may_grant(caller, required) {
        Ok(())
    } else {
        Err(AuthzError::Insufficient {
            role: caller,
            required,
        }
        .into())
    }
}

/// Changes `target_id`'s role. The caller's role must include both the
/// target's current role and the new one.
#[instrument(name = "hr.users.change_role", skip(db, caller), fields(caller_id = caller.id))]
pub async fn change_role(
    db: &DbPool,
    caller: &users::Model,
    target_id: i32,
    new_role: Role,
) -> HrResult<UserSummary> {
    let caller_role: Role = caller.role.parse()?;
    let target = users::Entity::find_by_id(target_id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("User", target_id))?;
    let current: Role = target.role.parse()?;
    guard(caller_role, current)?;
    guard(caller_role, new_role)?;
    if current == new_role {
        return UserSummary::from_model(target);
    }

    let mut active = target.into_active_model();
    active.role = Set(new_role.as_str().to_string());
    active.updated_at = Set(now());
    let updated = active.update(db).await?;
    info!(target_id, from = %current, to = %new_role, "role changed");
    events::role_changed(db, &updated, current, new_role, &caller.username).await;
    UserSummary::from_model(updated)
}

/// Enables or disables an account the caller's role includes.
pub async fn set_enabled(
    db: &DbPool,
    caller: &users::Model,
    target_id: i32,
    enabled: bool,
) -> HrResult<UserSummary> {
    let target = users::Entity::find_by_id(target_id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("User", target_id))?;
    guard(caller.role.parse()?, target.role.parse()?)?;
    if target.id == caller.id && !enabled {
        return Err(HrError::Conflict("Users cannot disable their own account".into()));
    }
    let mut active = target.into_active_model();
    active.enabled = Set(enabled);
    active.updated_at = Set(now());
    UserSummary::from_model(active.update(db).await?)
}

pub async fn stats(db: &DbPool, viewer: Role) -> HrResult<SystemStats> {
    let total_users = users::Entity::find().count(db).await?;
    let admin_count = users::Entity::find()
        .filter(users::Column::Role.eq(Role::Admin.as_str()))
        .count(db)
        .await?;
    let total_employees = employees::Entity::find().count(db).await?;

    let hidden: Vec<i32> = if viewer.has(Capability::SuperAdminAccess) {
        Vec::new()
    } else {
        users::Entity::find()
            .select_only()
            .column(users::Column::Id)
            .filter(users::Column::Role.eq(Role::SuperAdmin.as_str()))
            .into_tuple()
            .all(db)
            .await?
    };
    let mut visible = employees::Entity::find()
        .select_only()
        .column(employees::Column::Salary);
    if !hidden.is_empty() {
        visible = visible.filter(
            Condition::any()
                .add(employees::Column::UserId.is_null())
                .add(employees::Column::UserId.is_not_in(hidden.iter().copied())),
        );
    }
    let salaries: Vec<Option<Decimal>> = visible.into_tuple().all(db).await?;

    let hidden_accounts = hidden.len() as u64;
    Ok(SystemStats {
        total_users,
        visible_users: total_users - hidden_accounts,
        hidden_accounts,
        admin_count,
        total_employees,
        visible_employees: salaries.len() as u64,
        total_salary: salaries.into_iter().flatten().sum(),
    })
}

pub async fn counts_by_role(db: &DbPool) -> HrResult<Vec<RoleCount>> {
    let mut counts = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let count = users::Entity::find()
            .filter(users::Column::Role.eq(role.as_str()))
            .count(db)
            .await?;
        counts.push(RoleCount {
            role,
            display_name: role.display_name(),
            count,
        });
    }
    Ok(counts)
}

/// Creates the owner account and its employee record unless the username
/// already exists. Returns `None` when nothing was created.
#[instrument(name = "hr.users.seed_owner", skip_all, fields(username = %seed.username))]
pub async fn seed_owner(db: &DbPool, seed: OwnerSeed) -> HrResult<Option<users::Model>> {
    let exists = users::Entity::find()
        .filter(users::Column::Username.eq(seed.username.as_str()))
        .one(db)
        .await?;
    if exists.is_some() {
        info!("owner account already exists, skipping");
        return Ok(None);
    }
    let now = now();
    let user = users::ActiveModel {
        username: Set(seed.username),
        email: Set(seed.email.clone()),
        password_hash: Set(hash_password(&seed.password)?),
        role: Set(Role::SuperAdmin.as_str().to_string()),
        enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let code_free = employees::Entity::find()
        .filter(employees::Column::EmployeeCode.eq(OWNER_CODE))
        .count(db)
        .await?
        == 0;
    employee_service::create(
        db,
        EmployeeRequest {
            first_name: "System".into(),
            last_name: "Owner".into(),
            employee_code: code_free.then(|| OWNER_CODE.to_string()),
            department: Some("Executive Management".into()),
            position: Some("System Owner".into()),
            email: Some(seed.email),
            user_id: Some(user.id),
            ..Default::default()
        },
    )
    .await?;
    info!(user_id = user.id, "owner account created");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notifications,
        test_support::{insert_user, setup_db},
    };

    const STRONG: &str = "Str0ng!pass";

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: STRONG.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let db = setup_db().await;
        let mut request = registration("ada@example.test");
        request.name = Some("Ada King Lovelace".into());
        request.department = Some("Research".into());
        let registered = register(&db, request).await.unwrap();
        assert_eq!(registered.role, Role::Employee);
        assert_eq!(registered.username, "ada@example.test");
        assert_eq!(registered.employee_code.as_deref(), Some("EMPRES001"));
        assert_eq!(registered.department.as_deref(), Some("Research"));
        assert!(registered.capabilities.contains(&"ROLE_EMPLOYEE".to_string()));

        let employee = employee_service::find_by_user(&db, registered.id).await.unwrap().unwrap();
        assert_eq!(employee.first_name, "Ada");
        assert_eq!(employee.last_name, "King Lovelace");
        assert_eq!(employee.position.as_deref(), Some("New Employee"));

        let logged_in = login(
            &db,
            LoginRequest {
                email: "ada@example.test".into(),
                password: STRONG.into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.id, registered.id);
        let stored = users::Entity::find_by_id(registered.id).one(&db).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());

        let welcome = notifications::unread(&db, registered.id).await.unwrap();
        assert_eq!(welcome[0].title, "Welcome to the Employee Management System!");
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_weak_passwords() {
        let db = setup_db().await;
        register(&db, registration("a@example.test")).await.unwrap();
        assert!(matches!(
            register(&db, registration("a@example.test")).await,
            Err(HrError::Duplicate(_))
        ));
        let mut weak = registration("b@example.test");
        weak.password = "short".into();
        assert!(matches!(
            register(&db, weak).await,
            Err(HrError::Authn(platform_authn::AuthnError::WeakPassword(_)))
        ));
        let mut nameless = registration("c@example.test");
        nameless.employee_code = Some("X1".into());
        assert!(matches!(register(&db, nameless).await, Err(HrError::Validation(_))));
    }

    #[tokio::test]
    async fn taken_employee_code_leaves_no_account_behind() {
        let db = setup_db().await;
        let mut first = registration("a@example.test");
        first.name = Some("Ann Able".into());
        first.employee_code = Some("DUP01".into());
        register(&db, first).await.unwrap();

        let mut second = registration("b@example.test");
        second.name = Some("Ben Baker".into());
        second.employee_code = Some("DUP01".into());
        assert!(matches!(register(&db, second.clone()).await, Err(HrError::Duplicate(_))));
        assert!(find_by_email(&db, "b@example.test").await.unwrap().is_none());

        second.employee_code = Some("DUP02".into());
        let retried = register(&db, second).await.unwrap();
        assert_eq!(retried.employee_code.as_deref(), Some("DUP02"));
    }

    #[tokio::test]
    async fn bad_credentials_and_disabled_accounts() {
        let db = setup_db().await;
        let user = register(&db, registration("d@example.test")).await.unwrap();
        let wrong = LoginRequest {
            email: "d@example.test".into(),
            password: "nope".into(),
        };
        assert!(matches!(login(&db, wrong).await, Err(HrError::InvalidCredentials)));
        let unknown = LoginRequest {
            email: "ghost@example.test".into(),
            password: STRONG.into(),
        };
        assert!(matches!(login(&db, unknown).await, Err(HrError::InvalidCredentials)));

        let admin = insert_user(&db, "admin", Role::Admin).await;
        set_enabled(&db, &admin, user.id, false).await.unwrap();
        let right = LoginRequest {
            email: "d@example.test".into(),
            password: STRONG.into(),
        };
        assert!(matches!(login(&db, right).await, Err(HrError::AccountDisabled)));
        assert!(matches!(resolve_caller(&db, user.id).await, Err(HrError::AccountDisabled)));
        assert!(matches!(resolve_caller(&db, 999).await, Err(HrError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_stored_role_is_an_error() {
        let db = setup_db().await;
        let user = insert_user(&db, "odd", Role::Employee).await;
        let mut active = user.into_active_model();
        active.role = Set("OVERLORD".into());
        let user = active.update(&db).await.unwrap();
        assert!(matches!(
            resolve_caller(&db, user.id).await,
            Err(HrError::Authz(AuthzError::UnknownRole(_)))
        ));
    }

    #[tokio::test]
    async fn super_admins_are_hidden_from_others() {
        let db = setup_db().await;
        insert_user(&db, "root", Role::SuperAdmin).await;
        insert_user(&db, "admin", Role::Admin).await;
        insert_user(&db, "emp", Role::Employee).await;
        assert_eq!(list(&db, Role::Admin).await.unwrap().len(), 2);
        assert_eq!(list(&db, Role::SuperAdmin).await.unwrap().len(), 3);

        let counts = counts_by_role(&db).await.unwrap();
        let admin = counts.iter().find(|c| c.role == Role::Admin).unwrap();
        assert_eq!(admin.count, 1);
        assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn stats_leave_out_what_the_viewer_cannot_see() {
        let db = setup_db().await;
        seed_owner(
            &db,
            OwnerSeed {
                username: "owner".into(),
                email: "owner@example.test".into(),
                password: STRONG.into(),
            },
        )
        .await
        .unwrap();
        insert_user(&db, "admin", Role::Admin).await;
        let staff = [
            ("Ada", Some(Decimal::new(125_050, 2))),
            ("Alan", Some(Decimal::new(2000, 0))),
            ("Grace", None),
        ];
        for (first, salary) in staff {
            employee_service::create(
                &db,
                EmployeeRequest {
                    first_name: first.into(),
                    last_name: "Staff".into(),
                    salary,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let seen_by_hr = stats(&db, Role::Hr).await.unwrap();
        assert_eq!(seen_by_hr.total_users, 2);
        assert_eq!(seen_by_hr.visible_users, 1);
        assert_eq!(seen_by_hr.hidden_accounts, 1);
        assert_eq!(seen_by_hr.admin_count, 1);
        assert_eq!(seen_by_hr.total_employees, 4);
        assert_eq!(seen_by_hr.visible_employees, 3);
        assert_eq!(seen_by_hr.total_salary, Decimal::new(325_050, 2));

        let seen_by_root = stats(&db, Role::SuperAdmin).await.unwrap();
        assert_eq!(seen_by_root.visible_users, 2);
        assert_eq!(seen_by_root.hidden_accounts, 0);
        assert_eq!(seen_by_root.visible_employees, 4);
    }

    #[tokio::test]
    async fn role_changes_respect_the_hierarchy() {
        let db = setup_db().await;
        let hr = insert_user(&db, "hr", Role::Hr).await;
        let admin = insert_user(&db, "admin", Role::Admin).await;
        let emp = insert_user(&db, "emp", Role::Employee).await;

        let promoted = change_role(&db, &hr, emp.id, Role::Manager).await.unwrap();
        assert_eq!(promoted.role, Role::Manager);
        let notice = notifications::unread(&db, emp.id).await.unwrap();
        assert_eq!(notice[0].title, "Role Updated");

        assert!(matches!(
            change_role(&db, &hr, emp.id, Role::Admin).await,
            Err(HrError::Authz(AuthzError::Insufficient { .. }))
        ));
        assert!(matches!(
            change_role(&db, &hr, admin.id, Role::Employee).await,
            Err(HrError::Authz(AuthzError::Insufficient { .. }))
        ));
        let root = insert_user(&db, "root", Role::SuperAdmin).await;
        let elevated = change_role(&db, &root, admin.id, Role::SuperAdmin).await.unwrap();
        assert_eq!(elevated.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn owner_seed_is_idempotent() {
        let db = setup_db().await;
        let seed = OwnerSeed {
            username: "owner".into(),
            email: "owner@example.test".into(),
            password: STRONG.into(),
        };
        let created = seed_owner(&db, seed.clone()).await.unwrap().unwrap();
        assert_eq!(created.role, "SUPER_ADMIN");
        assert!(seed_owner(&db, seed).await.unwrap().is_none());
        let profile = me(&db, created.id).await.unwrap();
        assert_eq!(profile.employee_code.as_deref(), Some("EMS000"));
        assert!(profile.capabilities.contains(&"SUPER_ADMIN_ACCESS".to_string()));
    }
}
