use chrono::NaiveDate;
use entity::finance_reports::{self, ReportStatus, ReportType};
use platform_db::{DbPool, EqFilter, FilterSet, Page, PageRequest, RangeFilter, fetch_page};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{HrError, HrResult, error::Violations, non_blank, now};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReportFilter {
    pub report_type: Option<ReportType>,
    pub status: Option<ReportStatus>,
    pub department: Option<String>,
    pub period_start_from: Option<NaiveDate>,
    pub period_start_to: Option<NaiveDate>,
    pub period_end_from: Option<NaiveDate>,
    pub period_end_to: Option<NaiveDate>,
    pub total_revenue_min: Option<Decimal>,
    pub total_revenue_max: Option<Decimal>,
    pub total_expenses_min: Option<Decimal>,
    pub total_expenses_max: Option<Decimal>,
    pub net_profit_min: Option<Decimal>,
    pub net_profit_max: Option<Decimal>,
    pub budget_allocated_min: Option<Decimal>,
    pub budget_allocated_max: Option<Decimal>,
    pub budget_used_min: Option<Decimal>,
    pub budget_used_max: Option<Decimal>,
}

impl FinanceReportFilter {
    fn amounts(&self) -> [(finance_reports::Column, RangeFilter<Decimal>); 5] {
        use finance_reports::Column;
        [
            (Column::TotalRevenue, RangeFilter::new(self.total_revenue_min, self.total_revenue_max)),
            (Column::TotalExpenses, RangeFilter::new(self.total_expenses_min, self.total_expenses_max)),
            (Column::NetProfit, RangeFilter::new(self.net_profit_min, self.net_profit_max)),
            (Column::BudgetAllocated, RangeFilter::new(self.budget_allocated_min, self.budget_allocated_max)),
            (Column::BudgetUsed, RangeFilter::new(self.budget_used_min, self.budget_used_max)),
        ]
    }

    pub fn to_filter_set(&self) -> FilterSet {
        use finance_reports::Column;
        let set = FilterSet::new()
            .eq(Column::ReportType, EqFilter::new(self.report_type))
            .eq(Column::Status, EqFilter::new(self.status))
            .eq(Column::Department, EqFilter::text(self.department.clone()))
            .range(Column::PeriodStart, RangeFilter::new(self.period_start_from, self.period_start_to))
            .range(Column::PeriodEnd, RangeFilter::new(self.period_end_from, self.period_end_to));
        self.amounts()
            .into_iter()
            .fold(set, |set, (column, range)| set.range(column, range))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReportRequest {
    #[serde(alias = "reportTitle")]
    pub title: Option<String>,
    pub report_type: Option<ReportType>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub department: Option<String>,
    pub total_revenue: Option<Decimal>,
    pub total_expenses: Option<Decimal>,
    pub net_profit: Option<Decimal>,
    pub budget_allocated: Option<Decimal>,
    pub budget_used: Option<Decimal>,
    pub payroll_costs: Option<Decimal>,
    pub operational_costs: Option<Decimal>,
    pub summary: Option<String>,
    pub status: Option<ReportStatus>,
    pub created_by_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReportResponse {
    pub id: i32,
    pub title: String,
    pub report_type: ReportType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub department: Option<String>,
    pub total_revenue: Option<Decimal>,
    pub total_expenses: Option<Decimal>,
    pub net_profit: Option<Decimal>,
    pub budget_allocated: Option<Decimal>,
    pub budget_used: Option<Decimal>,
    pub payroll_costs: Option<Decimal>,
    pub operational_costs: Option<Decimal>,
    pub summary: Option<String>,
    pub status: ReportStatus,
    pub created_by_name: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<finance_reports::Model> for FinanceReportResponse {
    fn from(m: finance_reports::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            report_type: m.report_type,
            period_start: m.period_start,
            period_end: m.period_end,
            department: m.department,
            total_revenue: m.total_revenue,
            total_expenses: m.total_expenses,
            net_profit: m.net_profit,
            budget_allocated: m.budget_allocated,
            budget_used: m.budget_used,
            payroll_costs: m.payroll_costs,
            operational_costs: m.operational_costs,
            summary: m.summary,
            status: m.status,
            created_by_name: m.created_by_name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate(request: &FinanceReportRequest) -> HrResult<(String, ReportType, NaiveDate, NaiveDate)> {
    let mut v = Violations::new();
    let title = non_blank(request.title.clone());
    v.check(title.is_some(), "title", "title is required");
    v.check(request.report_type.is_some(), "reportType", "reportType is required");
    v.check(request.period_start.is_some(), "periodStart", "periodStart is required");
    v.check(request.period_end.is_some(), "periodEnd", "periodEnd is required");
    v.max_len(title.as_deref(), 255, "title");
    v.max_len(request.department.as_deref(), 100, "department");
    v.max_len(request.summary.as_deref(), 4000, "summary");
    v.max_len(request.created_by_name.as_deref(), 100, "createdByName");
    for (field, amount) in [
        ("totalRevenue", request.total_revenue),
        ("totalExpenses", request.total_expenses),
        ("netProfit", request.net_profit),
        ("budgetAllocated", request.budget_allocated),
        ("budgetUsed", request.budget_used),
        ("payrollCosts", request.payroll_costs),
        ("operationalCosts", request.operational_costs),
    ] {
        v.magnitude(amount, field);
    }
    if let (Some(start), Some(end)) = (request.period_start, request.period_end) {
        v.check(end >= start, "periodEnd", "periodEnd must not be before periodStart");
    }
    v.finish()?;
    match (title, request.report_type, request.period_start, request.period_end) {
        (Some(title), Some(kind), Some(start), Some(end)) => Ok((title, kind, start, end)),
        _ => Err(HrError::invalid("request", "incomplete finance report")),
    }
}

pub async fn list(
    db: &DbPool,
    filter: &FinanceReportFilter,
    page: PageRequest,
) -> HrResult<Page<FinanceReportResponse>> {
    let select = filter
        .to_filter_set()
        .apply(finance_reports::Entity::find())
        .order_by_asc(finance_reports::Column::Id);
    Ok(fetch_page(db, select, page).await?.map(Into::into))
}

async fn find_model(db: &DbPool, id: i32) -> HrResult<finance_reports::Model> {
    finance_reports::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("FinanceReport", id))
}

pub async fn get(db: &DbPool, id: i32) -> HrResult<FinanceReportResponse> {
    Ok(find_model(db, id).await?.into())
}

fn fill(active: &mut finance_reports::ActiveModel, request: FinanceReportRequest) {
    active.department = Set(non_blank(request.department));
    active.total_revenue = Set(request.total_revenue);
    active.total_expenses = Set(request.total_expenses);
    active.net_profit = Set(request.net_profit);
    active.budget_allocated = Set(request.budget_allocated);
    active.budget_used = Set(request.budget_used);
    active.payroll_costs = Set(request.payroll_costs);
    active.operational_costs = Set(request.operational_costs);
    active.summary = Set(non_blank(request.summary));
    active.created_by_name = Set(non_blank(request.created_by_name));
}

#[instrument(name = "hr.finance.create", skip_all)]
pub async fn create(db: &DbPool, request: FinanceReportRequest) -> HrResult<FinanceReportResponse> {
    let (title, report_type, start, end) = validate(&request)?;
    let now = now();
    let mut active = finance_reports::ActiveModel {
        title: Set(title),
        report_type: Set(report_type),
        period_start: Set(start),
        period_end: Set(end),
        status: Set(request.status.unwrap_or(ReportStatus::Draft)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    fill(&mut active, request);
    let model = active.insert(db).await?;
    info!(report_id = model.id, "finance report created");
    Ok(model.into())
}

#[instrument(name = "hr.finance.update", skip(db, request))]
pub async fn update(db: &DbPool, id: i32, request: FinanceReportRequest) -> HrResult<FinanceReportResponse> {
    let (title, report_type, start, end) = validate(&request)?;
    let existing = find_model(db, id).await?;
    let status = request.status.unwrap_or(existing.status);
    let mut active = existing.into_active_model();
    active.title = Set(title);
    active.report_type = Set(report_type);
    active.period_start = Set(start);
    active.period_end = Set(end);
    active.status = Set(status);
    active.updated_at = Set(now());
    fill(&mut active, request);
    Ok(active.update(db).await?.into())
}

pub async fn delete(db: &DbPool, id: i32) -> HrResult<bool> {
    let result = finance_reports::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{day, setup_db};

    fn report(title: &str, month: u32, revenue: i64) -> FinanceReportRequest {
        FinanceReportRequest {
            title: Some(title.into()),
            report_type: Some(ReportType::Monthly),
            period_start: Some(day(2024, month, 1)),
            period_end: Some(day(2024, month, 28)),
            total_revenue: Some(Decimal::new(revenue, 0)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_defaults_to_draft() {
        let db = setup_db().await;
        let created = create(&db, report("January", 1, 100)).await.unwrap();
        assert_eq!(created.status, ReportStatus::Draft);
        assert_eq!(created.total_revenue, Some(Decimal::new(100, 0)));
    }

    #[tokio::test]
    async fn title_alias_and_period_order_are_checked() {
        let request: FinanceReportRequest = serde_json::from_value(serde_json::json!({
            "reportTitle": "Q1",
            "reportType": "QUARTERLY",
            "periodStart": "2024-03-31",
            "periodEnd": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(request.title.as_deref(), Some("Q1"));
        let db = setup_db().await;
        let Err(HrError::Validation(fields)) = create(&db, request).await else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("periodEnd"));
    }

    #[tokio::test]
    async fn revenue_range_is_inclusive() {
        let db = setup_db().await;
        for (month, revenue) in [(1, 9), (2, 10), (3, 15), (4, 20), (5, 21)] {
            create(&db, report(&format!("m{month}"), month, revenue)).await.unwrap();
        }
        let filter = FinanceReportFilter {
            total_revenue_min: Some(Decimal::new(10, 0)),
            total_revenue_max: Some(Decimal::new(20, 0)),
            ..Default::default()
        };
        let page = list(&db, &filter, PageRequest::default()).await.unwrap();
        let titles: Vec<_> = page.content.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["m2", "m3", "m4"]);

        let at_least = FinanceReportFilter {
            total_revenue_min: Some(Decimal::new(10, 0)),
            ..Default::default()
        };
        assert_eq!(list(&db, &at_least, PageRequest::default()).await.unwrap().total_elements, 4);
    }

    #[tokio::test]
    async fn status_and_department_combine() {
        let db = setup_db().await;
        let mut sales = report("Sales Jan", 1, 50);
        sales.department = Some("Sales".into());
        sales.status = Some(ReportStatus::Published);
        create(&db, sales).await.unwrap();
        let mut draft = report("Sales Feb", 2, 60);
        draft.department = Some("Sales".into());
        create(&db, draft).await.unwrap();
        create(&db, report("Company Jan", 1, 70)).await.unwrap();

        let filter = FinanceReportFilter {
            department: Some("Sales".into()),
            status: Some(ReportStatus::Published),
            ..Default::default()
        };
        assert_eq!(filter.to_filter_set().active(), 2);
        let page = list(&db, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].title, "Sales Jan");
    }

    #[tokio::test]
    async fn update_keeps_status_and_delete_reports_missing() {
        let db = setup_db().await;
        let mut request = report("Audit", 6, 1);
        request.status = Some(ReportStatus::Approved);
        let created = create(&db, request).await.unwrap();
        let updated = update(&db, created.id, report("Audit v2", 6, 2)).await.unwrap();
        assert_eq!(updated.status, ReportStatus::Approved);
        assert_eq!(updated.title, "Audit v2");
        assert!(delete(&db, created.id).await.unwrap());
        assert!(!delete(&db, created.id).await.unwrap());
        assert!(matches!(
            update(&db, created.id, report("gone", 6, 3)).await,
            Err(HrError::NotFound { .. })
        ));
    }
}
