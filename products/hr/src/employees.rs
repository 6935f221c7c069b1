use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use entity::{
    departments,
    employees::{self, EmployeeStatus},
};
use platform_db::DbPool;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
    prelude::{DateTimeWithTimeZone, Expr},
    sea_query::Func,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{HrError, HrResult, error::Violations, events, non_blank, now};

const CODE_PREFIX: &str = "EMP";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeRequest {
    pub first_name: String,
    pub last_name: String,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub department_id: Option<i32>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub annual_vacation_days: Option<i32>,
    pub email: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub user_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub employee_code: String,
    /// Linked department name, falling back to the legacy text column.
    pub department: Option<String>,
    pub department_id: Option<i32>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub hire_date: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub annual_vacation_days: Option<i32>,
    pub email: Option<String>,
    pub status: EmployeeStatus,
    pub user_id: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl EmployeeResponse {
    pub fn from_model(model: employees::Model, department: Option<&departments::Model>) -> Self {
        Self {
            full_name: model.full_name(),
            department: department.map(|d| d.name.clone()).or(model.department),
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            employee_code: model.employee_code,
            department_id: model.department_id,
            position: model.position,
            phone: model.phone,
            address: model.address,
            hire_date: model.hire_date,
            birth_date: model.birth_date,
            salary: model.salary,
            bonus: model.bonus,
            annual_vacation_days: model.annual_vacation_days,
            email: model.email,
            status: model.status,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn to_responses(rows: Vec<(employees::Model, Option<departments::Model>)>) -> Vec<EmployeeResponse> {
    rows.into_iter()
        .map(|(employee, department)| EmployeeResponse::from_model(employee, department.as_ref()))
        .collect()
}

pub async fn list(db: &DbPool) -> HrResult<Vec<EmployeeResponse>> {
    let rows = employees::Entity::find()
        .find_also_related(departments::Entity)
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(to_responses(rows))
}

pub async fn get(db: &DbPool, id: i32) -> HrResult<EmployeeResponse> {
    let (employee, department) = employees::Entity::find_by_id(id)
        .find_also_related(departments::Entity)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("Employee", id))?;
    Ok(EmployeeResponse::from_model(employee, department.as_ref()))
}

pub(crate) async fn find_model(db: &DbPool, id: i32) -> HrResult<employees::Model> {
    employees::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("Employee", id))
}

pub async fn find_by_user(db: &DbPool, user_id: i32) -> HrResult<Option<EmployeeResponse>> {
    let row = employees::Entity::find()
        .filter(employees::Column::UserId.eq(user_id))
        .find_also_related(departments::Entity)
        .one(db)
        .await?;
    Ok(row.map(|(employee, department)| EmployeeResponse::from_model(employee, department.as_ref())))
}

fn validate(request: &EmployeeRequest) -> HrResult<()> {
    let mut v = Violations::new();
    v.required(&request.first_name, "firstName");
    v.required(&request.last_name, "lastName");
    v.max_len(Some(&request.first_name), 50, "firstName");
    v.max_len(Some(&request.last_name), 50, "lastName");
    v.max_len(request.employee_code.as_deref(), 20, "employeeCode");
    v.max_len(request.phone.as_deref(), 15, "phone");
    v.max_len(request.address.as_deref(), 200, "address");
    v.max_len(request.email.as_deref(), 100, "email");
    if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
        v.check(email.contains('@'), "email", "email must be a valid address");
    }
    v.amount(request.salary, "salary");
    v.amount(request.bonus, "bonus");
    v.in_range(request.annual_vacation_days, 0, 365, "annualVacationDays");
    v.finish()
}

async fn resolve_department<C: ConnectionTrait>(
    db: &C,
    department_id: Option<i32>,
) -> HrResult<Option<departments::Model>> {
    match department_id {
        Some(id) => departments::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(Some)
            .ok_or_else(|| HrError::not_found("Department", id)),
        None => Ok(None),
    }
}

async fn code_taken<C: ConnectionTrait>(db: &C, code: &str, except: Option<i32>) -> HrResult<bool> {
    let mut query = employees::Entity::find().filter(employees::Column::EmployeeCode.eq(code));
    if let Some(id) = except {
        query = query.filter(employees::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// `EMP` + first three letters of the department, upper-cased, + a
/// three-digit sequence starting at the current head count plus one.
pub fn employee_code(department: Option<&str>, sequence: u64) -> String {
    let dept: String = department
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(3)
        .collect::<String>()
        .to_uppercase();
    format!("{CODE_PREFIX}{dept}{sequence:03}")
}

async fn generate_code<C: ConnectionTrait>(db: &C, department: Option<&str>) -> HrResult<String> {
    let mut sequence = employees::Entity::find().count(db).await? + 1;
    loop {
        let candidate = employee_code(department, sequence);
        if !code_taken(db, &candidate, None).await? {
            return Ok(candidate);
        }
        sequence += 1;
    }
}

#[instrument(name = "hr.employees.create", skip_all, fields(department_id = request.department_id))]
pub async fn create(db: &DbPool, request: EmployeeRequest) -> HrResult<EmployeeResponse> {
    let response = insert(db, request).await?;
    events::new_employee(db, &response).await;
    Ok(response)
}

/// Validates and stores a new employee on `db`, which may be a transaction.
/// Raises no notifications.
pub(crate) async fn insert<C: ConnectionTrait>(db: &C, request: EmployeeRequest) -> HrResult<EmployeeResponse> {
    validate(&request)?;
    let department = resolve_department(db, request.department_id).await?;
    let legacy = non_blank(request.department.clone());
    let code = match non_blank(request.employee_code.clone()) {
        Some(code) => {
            if code_taken(db, &code, None).await? {
                return Err(HrError::Duplicate(format!(
                    "Employee with ID {code} already exists"
                )));
            }
            code
        }
        None => {
            let label = department.as_ref().map(|d| d.name.as_str()).or(legacy.as_deref());
            generate_code(db, label).await?
        }
    };

    let now = now();
    let model = employees::ActiveModel {
        first_name: Set(request.first_name.trim().to_string()),
        last_name: Set(request.last_name.trim().to_string()),
        employee_code: Set(code),
        department: Set(legacy),
        department_id: Set(request.department_id),
        position: Set(non_blank(request.position)),
        phone: Set(non_blank(request.phone)),
        address: Set(non_blank(request.address)),
        hire_date: Set(request.hire_date.unwrap_or_else(|| Utc::now().date_naive())),
        birth_date: Set(request.birth_date),
        salary: Set(request.salary),
        bonus: Set(request.bonus),
        annual_vacation_days: Set(request.annual_vacation_days),
        email: Set(non_blank(request.email)),
        status: Set(request.status.unwrap_or(EmployeeStatus::Active)),
        user_id: Set(request.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(employee_id = model.id, code = %model.employee_code, "employee created");

    Ok(EmployeeResponse::from_model(model, department.as_ref()))
}

#[instrument(name = "hr.employees.update", skip_all, fields(employee_id = id))]
pub async fn update(db: &DbPool, id: i32, request: EmployeeRequest) -> HrResult<EmployeeResponse> {
    validate(&request)?;
    let existing = find_model(db, id).await?;
    let department = resolve_department(db, request.department_id).await?;

    let code = match non_blank(request.employee_code.clone()) {
        Some(code) if code != existing.employee_code => {
            if code_taken(db, &code, Some(id)).await? {
                return Err(HrError::Duplicate(format!(
                    "Employee with ID {code} already exists"
                )));
            }
            code
        }
        _ => existing.employee_code.clone(),
    };

    let status = request.status.unwrap_or(existing.status);
    let hire_date = request.hire_date.unwrap_or(existing.hire_date);
    let moved = existing.department_id != request.department_id;
    let mut active = existing.into_active_model();
    active.first_name = Set(request.first_name.trim().to_string());
    active.last_name = Set(request.last_name.trim().to_string());
    active.employee_code = Set(code);
    active.department = Set(non_blank(request.department));
    active.department_id = Set(request.department_id);
    active.position = Set(non_blank(request.position));
    active.phone = Set(non_blank(request.phone));
    active.address = Set(non_blank(request.address));
    active.hire_date = Set(hire_date);
    active.birth_date = Set(request.birth_date);
    active.salary = Set(request.salary);
    active.bonus = Set(request.bonus);
    active.annual_vacation_days = Set(request.annual_vacation_days);
    active.email = Set(non_blank(request.email));
    active.status = Set(status);
    active.user_id = Set(request.user_id);
    active.updated_at = Set(now());
    let model = active.update(db).await?;
    if moved {
        release_headships(db, id, model.department_id).await?;
    }
    Ok(EmployeeResponse::from_model(model, department.as_ref()))
}

pub async fn update_status(
    db: &DbPool,
    id: i32,
    status: EmployeeStatus,
) -> HrResult<EmployeeResponse> {
    let mut active = find_model(db, id).await?.into_active_model();
    active.status = Set(status);
    active.updated_at = Set(now());
    active.update(db).await?;
    get(db, id).await
}

/// Clears head references to `employee_id` on every department except `keep`.
async fn release_headships(db: &DbPool, employee_id: i32, keep: Option<i32>) -> HrResult<()> {
    let mut query = departments::Entity::update_many()
        .col_expr(departments::Column::HeadEmployeeId, Expr::value(Option::<i32>::None))
        .col_expr(departments::Column::UpdatedAt, Expr::value(now()))
        .filter(departments::Column::HeadEmployeeId.eq(employee_id));
    if let Some(department_id) = keep {
        query = query.filter(departments::Column::Id.ne(department_id));
    }
    let cleared = query.exec(db).await?;
    if cleared.rows_affected > 0 {
        info!(employee_id, departments = cleared.rows_affected, "department head cleared");
    }
    Ok(())
}

/// Deletes the employee and clears any department head reference to it.
#[instrument(name = "hr.employees.delete", skip(db))]
pub async fn delete(db: &DbPool, id: i32) -> HrResult<()> {
    let employee = find_model(db, id).await?;
    release_headships(db, id, None).await?;
    employees::Entity::delete_by_id(employee.id).exec(db).await?;
    Ok(())
}

/// Case-insensitive match on first or last name.
pub async fn search(db: &DbPool, query: &str) -> HrResult<Vec<EmployeeResponse>> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return list(db).await;
    }
    let pattern = format!("%{}%", trimmed.to_lowercase());
    let first = Expr::expr(Func::lower(Expr::col((employees::Entity, employees::Column::FirstName))));
    let last = Expr::expr(Func::lower(Expr::col((employees::Entity, employees::Column::LastName))));
    let rows = employees::Entity::find()
        .filter(Condition::any().add(first.like(pattern.clone())).add(last.like(pattern)))
        .find_also_related(departments::Entity)
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(to_responses(rows))
}

/// Matches the legacy text column or the linked department's name.
pub async fn by_department(db: &DbPool, name: &str) -> HrResult<Vec<EmployeeResponse>> {
    let linked: Vec<i32> = departments::Entity::find()
        .filter(departments::Column::Name.eq(name))
        .all(db)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();
    let mut condition = Condition::any().add(employees::Column::Department.eq(name));
    if !linked.is_empty() {
        condition = condition.add(employees::Column::DepartmentId.is_in(linked));
    }
    let rows = employees::Entity::find()
        .filter(condition)
        .find_also_related(departments::Entity)
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(to_responses(rows))
}

pub async fn by_status(db: &DbPool, status: EmployeeStatus) -> HrResult<Vec<EmployeeResponse>> {
    let rows = employees::Entity::find()
        .filter(employees::Column::Status.eq(status))
        .find_also_related(departments::Entity)
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(to_responses(rows))
}

/// Employee counts keyed by department id, for department listings.
pub(crate) async fn counts_by_department(db: &DbPool) -> HrResult<HashMap<i32, u64>> {
    let mut counts = HashMap::new();
    for employee in employees::Entity::find()
        .filter(employees::Column::DepartmentId.is_not_null())
        .all(db)
        .await?
    {
        if let Some(department_id) = employee.department_id {
            *counts.entry(department_id).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
