use std::collections::HashMap;

use entity::{
    departments::{self, DepartmentStatus},
    employees, users,
};
use platform_authz::{Role, includes};
use platform_db::DbPool;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    HrError, HrResult,
    employees::{self as employee_service, EmployeeResponse},
    error::Violations,
    events, non_blank, now,
};

/// Create and partial-update payload. Absent fields are left untouched on update.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub budget_allocated: Option<Decimal>,
    pub budget_spent: Option<Decimal>,
    pub status: Option<DepartmentStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub head_employee_id: Option<i32>,
    pub head_employee_name: Option<String>,
    pub budget_allocated: Decimal,
    pub budget_spent: Decimal,
    pub budget_remaining: Decimal,
    pub status: DepartmentStatus,
    pub employee_count: u64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl DepartmentResponse {
    fn from_model(model: departments::Model, head: Option<&employees::Model>, employee_count: u64) -> Self {
        Self {
            budget_remaining: model.budget_remaining(),
            head_employee_name: head.map(employees::Model::full_name),
            id: model.id,
            name: model.name,
            description: model.description,
            head_employee_id: model.head_employee_id,
            budget_allocated: model.budget_allocated,
            budget_spent: model.budget_spent,
            status: model.status,
            employee_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentBudget {
    pub department_id: i32,
    pub name: String,
    pub budget_allocated: Decimal,
    pub budget_spent: Decimal,
    pub budget_remaining: Decimal,
    /// Spent as a percentage of allocated, two decimal places. `None` without an allocation.
    pub utilization_percent: Option<Decimal>,
}

async fn find_model(db: &DbPool, id: i32) -> HrResult<departments::Model> {
    departments::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("Department", id))
}

async fn head_of(db: &DbPool, model: &departments::Model) -> HrResult<Option<employees::Model>> {
    match model.head_employee_id {
        Some(id) => Ok(employees::Entity::find_by_id(id).one(db).await?),
        None => Ok(None),
    }
}

async fn employee_count(db: &DbPool, id: i32) -> HrResult<u64> {
    Ok(employees::Entity::find()
        .filter(employees::Column::DepartmentId.eq(id))
        .count(db)
        .await?)
}

async fn respond(db: &DbPool, model: departments::Model) -> HrResult<DepartmentResponse> {
    let head = head_of(db, &model).await?;
    let count = employee_count(db, model.id).await?;
    Ok(DepartmentResponse::from_model(model, head.as_ref(), count))
}

pub async fn list(db: &DbPool) -> HrResult<Vec<DepartmentResponse>> {
    let models = departments::Entity::find()
        .order_by_asc(departments::Column::Id)
        .all(db)
        .await?;
    let head_ids: Vec<i32> = models.iter().filter_map(|d| d.head_employee_id).collect();
    let heads: HashMap<i32, employees::Model> = if head_ids.is_empty() {
        HashMap::new()
    } else {
        employees::Entity::find()
            .filter(employees::Column::Id.is_in(head_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect()
    };
    let counts = employee_service::counts_by_department(db).await?;
    Ok(models
        .into_iter()
        .map(|model| {
            let head = model.head_employee_id.and_then(|id| heads.get(&id));
            let count = counts.get(&model.id).copied().unwrap_or(0);
            DepartmentResponse::from_model(model, head, count)
        })
        .collect())
}

pub async fn get(db: &DbPool, id: i32) -> HrResult<DepartmentResponse> {
    let model = find_model(db, id).await?;
    respond(db, model).await
}

async fn name_taken(db: &DbPool, name: &str, except: Option<i32>) -> HrResult<bool> {
    let mut query = departments::Entity::find().filter(departments::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(departments::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

fn validate(request: &DepartmentRequest, creating: bool) -> HrResult<()> {
    let mut v = Violations::new();
    match request.name.as_deref() {
        Some(name) => v.required(name, "name"),
        None if creating => v.add("name", "name is required"),
        None => {}
    }
    v.max_len(request.name.as_deref(), 100, "name");
    v.max_len(request.description.as_deref(), 500, "description");
    v.amount(request.budget_allocated, "budgetAllocated");
    v.amount(request.budget_spent, "budgetSpent");
    v.finish()
}

#[instrument(name = "hr.departments.create", skip_all)]
pub async fn create(db: &DbPool, request: DepartmentRequest) -> HrResult<DepartmentResponse> {
    validate(&request, true)?;
    let name = request.name.unwrap_or_default().trim().to_string();
    if name_taken(db, &name, None).await? {
        return Err(HrError::Duplicate(format!(
            "Department with name {name} already exists"
        )));
    }
    let now = now();
    let model = departments::ActiveModel {
        name: Set(name),
        description: Set(non_blank(request.description)),
        head_employee_id: Set(None),
        budget_allocated: Set(request.budget_allocated.unwrap_or(Decimal::ZERO)),
        budget_spent: Set(request.budget_spent.unwrap_or(Decimal::ZERO)),
        status: Set(request.status.unwrap_or(DepartmentStatus::Active)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(department_id = model.id, name = %model.name, "department created");
    Ok(DepartmentResponse::from_model(model, None, 0))
}

#[instrument(name = "hr.departments.update", skip(db, request))]
pub async fn update(db: &DbPool, id: i32, request: DepartmentRequest) -> HrResult<DepartmentResponse> {
    validate(&request, false)?;
    let existing = find_model(db, id).await?;
    let mut active = existing.clone().into_active_model();
    if let Some(name) = request.name.map(|n| n.trim().to_string()) {
        if name != existing.name && name_taken(db, &name, Some(id)).await? {
            return Err(HrError::Duplicate(format!(
                "Department with name {name} already exists"
            )));
        }
        active.name = Set(name);
    }
    if let Some(description) = request.description {
        active.description = Set(non_blank(Some(description)));
    }
    if let Some(allocated) = request.budget_allocated {
        active.budget_allocated = Set(allocated);
    }
    if let Some(spent) = request.budget_spent {
        active.budget_spent = Set(spent);
    }
    if let Some(status) = request.status {
        active.status = Set(status);
    }
    active.updated_at = Set(now());
    let model = active.update(db).await?;
    respond(db, model).await
}

/// Makes `employee_id` the head of `department_id`.
///
/// An employee without a department is moved into this one; an employee of a
/// different department is rejected. The linked account, if any, is promoted
/// to DEPARTMENT_HEAD unless its role already includes it.
#[instrument(name = "hr.departments.assign_head", skip(db))]
pub async fn assign_head(
    db: &DbPool,
    department_id: i32,
    employee_id: i32,
    assigned_by: Option<i32>,
) -> HrResult<DepartmentResponse> {
    let department = find_model(db, department_id).await?;
    let employee = employee_service::find_model(db, employee_id).await?;
    match employee.department_id {
        Some(current) if current != department_id => {
            return Err(HrError::invalid(
                "headEmployeeId",
                format!("employee {employee_id} belongs to another department"),
            ));
        }
        Some(_) => {}
        None => {
            let mut moved = employee.clone().into_active_model();
            moved.department_id = Set(Some(department_id));
            moved.updated_at = Set(now());
            moved.update(db).await?;
        }
    }

    let mut active = department.into_active_model();
    active.head_employee_id = Set(Some(employee_id));
    active.updated_at = Set(now());
    let model = active.update(db).await?;
    info!(department_id, employee_id, "department head assigned");

    if let Some(user_id) = employee.user_id {
        promote_to_head(db, user_id).await?;
        events::head_assigned(db, user_id, &model.name, assigned_by).await;
    }
    respond(db, model).await
}

async fn promote_to_head(db: &DbPool, user_id: i32) -> HrResult<()> {
    let Some(user) = users::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(());
    };
    let role: Role = user.role.parse()?;
    if role == Role::SuperAdmin || includes(role, Role::DepartmentHead) {
        return Ok(());
    }
    let mut active = user.into_active_model();
    active.role = Set(Role::DepartmentHead.as_str().to_string());
    active.updated_at = Set(now());
    active.update(db).await?;
    info!(user_id, from = %role, "account promoted to department head");
    Ok(())
}

#[instrument(name = "hr.departments.delete", skip(db))]
pub async fn delete(db: &DbPool, id: i32) -> HrResult<()> {
    let model = find_model(db, id).await?;
    let members = employee_count(db, id).await?;
    if members > 0 {
        return Err(HrError::Conflict(format!(
            "Department {} still has {members} employee(s)",
            model.name
        )));
    }
    departments::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn budget(db: &DbPool, id: i32) -> HrResult<DepartmentBudget> {
    let model = find_model(db, id).await?;
    let utilization_percent = (!model.budget_allocated.is_zero())
        .then(|| (model.budget_spent * Decimal::ONE_HUNDRED / model.budget_allocated).round_dp(2));
    Ok(DepartmentBudget {
        department_id: model.id,
        budget_remaining: model.budget_remaining(),
        name: model.name,
        budget_allocated: model.budget_allocated,
        budget_spent: model.budget_spent,
        utilization_percent,
    })
}

pub async fn employees(db: &DbPool, id: i32) -> HrResult<Vec<EmployeeResponse>> {
    let model = find_model(db, id).await?;
    let members = employees::Entity::find()
        .filter(employees::Column::DepartmentId.eq(id))
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(members
        .into_iter()
        .map(|e| EmployeeResponse::from_model(e, Some(&model)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        employees::EmployeeRequest,
        test_support::{insert_user, setup_db},
    };

    fn named(name: &str) -> DepartmentRequest {
        DepartmentRequest {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    async fn hire(db: &DbPool, first: &str, department_id: Option<i32>, user_id: Option<i32>) -> EmployeeResponse {
        employee_service::create(
            db,
            EmployeeRequest {
                first_name: first.into(),
                last_name: "Tester".into(),
                department_id,
                user_id,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_applies_defaults_and_rejects_duplicates() {
        let db = setup_db().await;
        let created = create(&db, named("Engineering")).await.unwrap();
        assert_eq!(created.status, DepartmentStatus::Active);
        assert_eq!(created.budget_allocated, Decimal::ZERO);
        assert_eq!(created.employee_count, 0);
        assert!(matches!(
            create(&db, named("Engineering")).await,
            Err(HrError::Duplicate(_))
        ));
        assert!(matches!(
            create(&db, DepartmentRequest::default()).await,
            Err(HrError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_is_partial() {
        let db = setup_db().await;
        let mut request = named("Sales");
        request.description = Some("Closers".into());
        let created = create(&db, request).await.unwrap();
        let updated = update(
            &db,
            created.id,
            DepartmentRequest {
                budget_allocated: Some(Decimal::new(5000, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Sales");
        assert_eq!(updated.description.as_deref(), Some("Closers"));
        assert_eq!(updated.budget_remaining, Decimal::new(5000, 0));
    }

    #[tokio::test]
    async fn listing_reports_heads_and_counts() {
        let db = setup_db().await;
        let eng = create(&db, named("Engineering")).await.unwrap();
        create(&db, named("Empty")).await.unwrap();
        let ada = hire(&db, "Ada", Some(eng.id), None).await;
        hire(&db, "Alan", Some(eng.id), None).await;
        assign_head(&db, eng.id, ada.id, None).await.unwrap();

        let all = list(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].employee_count, 2);
        assert_eq!(all[0].head_employee_name.as_deref(), Some("Ada Tester"));
        assert_eq!(all[1].employee_count, 0);
        assert_eq!(all[1].head_employee_name, None);
    }

    #[tokio::test]
    async fn assigning_head_promotes_linked_account() {
        let db = setup_db().await;
        let dept = create(&db, named("Finance")).await.unwrap();
        let account = insert_user(&db, "grace", Role::Employee).await;
        let grace = hire(&db, "Grace", None, Some(account.id)).await;

        let updated = assign_head(&db, dept.id, grace.id, None).await.unwrap();
        assert_eq!(updated.head_employee_id, Some(grace.id));
        assert_eq!(updated.employee_count, 1);

        let account = users::Entity::find_by_id(account.id).one(&db).await.unwrap().unwrap();
        assert_eq!(account.role, "DEPARTMENT_HEAD");
    }

    #[tokio::test]
    async fn assigning_head_keeps_higher_roles() {
        let db = setup_db().await;
        let dept = create(&db, named("People")).await.unwrap();
        let account = insert_user(&db, "hera", Role::Hr).await;
        let hera = hire(&db, "Hera", Some(dept.id), Some(account.id)).await;
        assign_head(&db, dept.id, hera.id, None).await.unwrap();
        let account = users::Entity::find_by_id(account.id).one(&db).await.unwrap().unwrap();
        assert_eq!(account.role, "HR");
    }

    #[tokio::test]
    async fn assigning_missing_or_foreign_employee_fails() {
        let db = setup_db().await;
        let a = create(&db, named("A")).await.unwrap();
        let b = create(&db, named("B")).await.unwrap();
        assert!(matches!(
            assign_head(&db, a.id, 404, None).await,
            Err(HrError::NotFound { entity: "Employee", .. })
        ));
        let outsider = hire(&db, "Otto", Some(b.id), None).await;
        assert!(matches!(
            assign_head(&db, a.id, outsider.id, None).await,
            Err(HrError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deleting_head_employee_clears_reference() {
        let db = setup_db().await;
        let dept = create(&db, named("Ops")).await.unwrap();
        let head = hire(&db, "Hank", Some(dept.id), None).await;
        assign_head(&db, dept.id, head.id, None).await.unwrap();

        employee_service::delete(&db, head.id).await.unwrap();
        let after = get(&db, dept.id).await.unwrap();
        assert_eq!(after.head_employee_id, None);
        assert_eq!(after.head_employee_name, None);
    }

    #[tokio::test]
    async fn moving_head_to_another_department_vacates_the_old_post() {
        let db = setup_db().await;
        let ops = create(&db, named("Ops")).await.unwrap();
        let sales = create(&db, named("Sales")).await.unwrap();
        let head = hire(&db, "Hank", Some(ops.id), None).await;
        assign_head(&db, ops.id, head.id, None).await.unwrap();

        let mut edit = EmployeeRequest {
            first_name: "Hank".into(),
            last_name: "Tester".into(),
            department_id: Some(ops.id),
            ..Default::default()
        };
        employee_service::update(&db, head.id, edit.clone()).await.unwrap();
        assert_eq!(get(&db, ops.id).await.unwrap().head_employee_id, Some(head.id));

        edit.department_id = Some(sales.id);
        employee_service::update(&db, head.id, edit).await.unwrap();
        let old = get(&db, ops.id).await.unwrap();
        assert_eq!(old.head_employee_id, None);
        assert_eq!(old.employee_count, 0);
        assert_eq!(get(&db, sales.id).await.unwrap().employee_count, 1);
    }

    #[tokio::test]
    async fn delete_is_refused_while_staffed() {
        let db = setup_db().await;
        let dept = create(&db, named("Legal")).await.unwrap();
        let member = hire(&db, "Lara", Some(dept.id), None).await;
        assert!(matches!(delete(&db, dept.id).await, Err(HrError::Conflict(_))));
        employee_service::delete(&db, member.id).await.unwrap();
        delete(&db, dept.id).await.unwrap();
        assert!(matches!(get(&db, dept.id).await, Err(HrError::NotFound { .. })));
    }

    #[tokio::test]
    async fn budget_reports_utilization() {
        let db = setup_db().await;
        let dept = create(
            &db,
            DepartmentRequest {
                name: Some("R&D".into()),
                budget_allocated: Some(Decimal::new(8000, 0)),
                budget_spent: Some(Decimal::new(2000, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let view = budget(&db, dept.id).await.unwrap();
        assert_eq!(view.budget_remaining, Decimal::new(6000, 0));
        assert_eq!(view.utilization_percent, Some(Decimal::new(25, 0)));

        let unfunded = create(&db, named("Volunteers")).await.unwrap();
        assert_eq!(budget(&db, unfunded.id).await.unwrap().utilization_percent, None);
    }

    #[tokio::test]
    async fn members_resolve_department_name() {
        let db = setup_db().await;
        let dept = create(&db, named("Support")).await.unwrap();
        hire(&db, "Sam", Some(dept.id), None).await;
        hire(&db, "Nobody", None, None).await;
        let members = employees(&db, dept.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].department.as_deref(), Some("Support"));
    }
}
