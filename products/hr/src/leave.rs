use chrono::NaiveDate;
use entity::leave_requests::{self, LeaveStatus, LeaveType};
use platform_db::{DbPool, EqFilter, FilterSet, Page, PageRequest, RangeFilter, fetch_page};
use sea_orm::{
    ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{HrError, HrResult, error::Violations, non_blank, now};

/// Query-string criteria for the leave request listing.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestFilter {
    #[serde(alias = "employeeId")]
    pub employee_code: Option<String>,
    pub leave_type: Option<LeaveType>,
    pub status: Option<LeaveStatus>,
    pub start_date_from: Option<NaiveDate>,
    pub start_date_to: Option<NaiveDate>,
    pub end_date_from: Option<NaiveDate>,
    pub end_date_to: Option<NaiveDate>,
}

impl LeaveRequestFilter {
    fn employee_code(&self) -> EqFilter<String> {
        EqFilter::text(self.employee_code.clone())
    }

    fn start_date(&self) -> RangeFilter<NaiveDate> {
        RangeFilter::new(self.start_date_from, self.start_date_to)
    }

    fn end_date(&self) -> RangeFilter<NaiveDate> {
        RangeFilter::new(self.end_date_from, self.end_date_to)
    }

    pub fn to_filter_set(&self) -> FilterSet {
        use leave_requests::Column;
        FilterSet::new()
            .eq(Column::EmployeeCode, self.employee_code())
            .eq(Column::LeaveType, EqFilter::new(self.leave_type))
            .eq(Column::Status, EqFilter::new(self.status))
            .range(Column::StartDate, self.start_date())
            .range(Column::EndDate, self.end_date())
    }

    /// In-memory counterpart of [`Self::to_filter_set`].
    pub fn matches(&self, row: &leave_requests::Model) -> bool {
        self.employee_code().matches(&row.employee_code)
            && EqFilter::new(self.leave_type).matches(&row.leave_type)
            && EqFilter::new(self.status).matches(&row.status)
            && self.start_date().contains(&row.start_date)
            && self.end_date().contains(&row.end_date)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestRequest {
    #[serde(alias = "employeeId")]
    pub employee_code: Option<String>,
    pub employee_name: Option<String>,
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Derived from the date span when absent.
    pub days_requested: Option<i32>,
    pub reason: Option<String>,
    pub status: Option<LeaveStatus>,
    pub approved_by: Option<String>,
    pub comments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestResponse {
    pub id: i32,
    pub employee_code: String,
    pub employee_name: Option<String>,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: i32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub comments: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<leave_requests::Model> for LeaveRequestResponse {
    fn from(m: leave_requests::Model) -> Self {
        Self {
            id: m.id,
            employee_code: m.employee_code,
            employee_name: m.employee_name,
            leave_type: m.leave_type,
            start_date: m.start_date,
            end_date: m.end_date,
            days_requested: m.days_requested,
            reason: m.reason,
            status: m.status,
            approved_by: m.approved_by,
            approved_at: m.approved_at,
            comments: m.comments,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A request that passed validation; every required field is present.
struct Valid {
    employee_code: String,
    leave_type: LeaveType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days_requested: i32,
    reason: String,
}

fn validate(request: &LeaveRequestRequest) -> HrResult<Valid> {
    let mut v = Violations::new();
    let code = non_blank(request.employee_code.clone());
    let reason = non_blank(request.reason.clone());
    v.check(code.is_some(), "employeeCode", "employeeCode is required");
    v.check(request.leave_type.is_some(), "leaveType", "leaveType is required");
    v.check(request.start_date.is_some(), "startDate", "startDate is required");
    v.check(request.end_date.is_some(), "endDate", "endDate is required");
    v.check(reason.is_some(), "reason", "reason is required");
    v.max_len(code.as_deref(), 20, "employeeCode");
    v.max_len(request.employee_name.as_deref(), 255, "employeeName");
    v.max_len(reason.as_deref(), 4000, "reason");
    v.max_len(request.approved_by.as_deref(), 255, "approvedBy");
    v.max_len(request.comments.as_deref(), 4000, "comments");
    if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
        v.check(end >= start, "endDate", "endDate must not be before startDate");
    }
    if let Some(days) = request.days_requested {
        v.check(days > 0, "daysRequested", "daysRequested must be positive");
    }
    v.finish()?;

    match (code, request.leave_type, request.start_date, request.end_date, reason) {
        (Some(employee_code), Some(leave_type), Some(start_date), Some(end_date), Some(reason)) => {
            let span = (end_date - start_date).num_days() + 1;
            Ok(Valid {
                employee_code,
                leave_type,
                start_date,
                end_date,
                days_requested: request
                    .days_requested
                    .unwrap_or_else(|| i32::try_from(span).unwrap_or(i32::MAX)),
                reason,
            })
        }
        _ => Err(HrError::invalid("request", "incomplete leave request")),
    }
}

fn is_decision(status: LeaveStatus) -> bool {
    matches!(status, LeaveStatus::Approved | LeaveStatus::Rejected)
}

pub async fn list(
    db: &DbPool,
    filter: &LeaveRequestFilter,
    page: PageRequest,
) -> HrResult<Page<LeaveRequestResponse>> {
    let select = filter
        .to_filter_set()
        .apply(leave_requests::Entity::find())
        .order_by_asc(leave_requests::Column::Id);
    Ok(fetch_page(db, select, page).await?.map(Into::into))
}

async fn find_model(db: &DbPool, id: i32) -> HrResult<leave_requests::Model> {
    leave_requests::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("LeaveRequest", id))
}

pub async fn get(db: &DbPool, id: i32) -> HrResult<LeaveRequestResponse> {
    Ok(find_model(db, id).await?.into())
}

#[instrument(name = "hr.leave.create", skip_all)]
pub async fn create(db: &DbPool, request: LeaveRequestRequest) -> HrResult<LeaveRequestResponse> {
    let valid = validate(&request)?;
    let status = request.status.unwrap_or(LeaveStatus::Pending);
    let now = now();
    let model = leave_requests::ActiveModel {
        employee_code: Set(valid.employee_code),
        employee_name: Set(non_blank(request.employee_name)),
        leave_type: Set(valid.leave_type),
        start_date: Set(valid.start_date),
        end_date: Set(valid.end_date),
        days_requested: Set(valid.days_requested),
        reason: Set(valid.reason),
        status: Set(status),
        approved_by: Set(non_blank(request.approved_by)),
        approved_at: Set(is_decision(status).then_some(now)),
        comments: Set(non_blank(request.comments)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(leave_request_id = model.id, employee = %model.employee_code, "leave request created");
    Ok(model.into())
}

/// Replaces every field but the id. A missing status keeps the stored one;
/// the decision time is stamped when the status first becomes a decision.
#[instrument(name = "hr.leave.update", skip(db, request))]
pub async fn update(db: &DbPool, id: i32, request: LeaveRequestRequest) -> HrResult<LeaveRequestResponse> {
    let valid = validate(&request)?;
    let existing = find_model(db, id).await?;
    let status = request.status.unwrap_or(existing.status);
    let now = now();
    let approved_at = if is_decision(status) && status != existing.status {
        Some(now)
    } else if is_decision(status) {
        existing.approved_at
    } else {
        None
    };

    let mut active = existing.into_active_model();
    active.employee_code = Set(valid.employee_code);
    active.employee_name = Set(non_blank(request.employee_name));
    active.leave_type = Set(valid.leave_type);
    active.start_date = Set(valid.start_date);
    active.end_date = Set(valid.end_date);
    active.days_requested = Set(valid.days_requested);
    active.reason = Set(valid.reason);
    active.status = Set(status);
    active.approved_by = Set(non_blank(request.approved_by));
    active.approved_at = Set(approved_at);
    active.comments = Set(non_blank(request.comments));
    active.updated_at = Set(now);
    Ok(active.update(db).await?.into())
}

/// Returns `false` when nothing was deleted.
pub async fn delete(db: &DbPool, id: i32) -> HrResult<bool> {
    let result = leave_requests::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
