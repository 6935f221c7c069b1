use chrono::NaiveDate;
use entity::company_metrics::{self, MetricPeriod, MetricType};
use platform_db::{DbPool, EqFilter, FilterSet, Page, PageRequest, RangeFilter, fetch_page};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};

use crate::{HrError, HrResult, error::Violations, non_blank, now};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMetricFilter {
    pub metric_type: Option<MetricType>,
    pub period: Option<MetricPeriod>,
    pub period_start_from: Option<NaiveDate>,
    pub period_start_to: Option<NaiveDate>,
    pub period_end_from: Option<NaiveDate>,
    pub period_end_to: Option<NaiveDate>,
}

impl CompanyMetricFilter {
    pub fn to_filter_set(&self) -> FilterSet {
        use company_metrics::Column;
        FilterSet::new()
            .eq(Column::MetricType, EqFilter::new(self.metric_type))
            .eq(Column::Period, EqFilter::new(self.period))
            .range(Column::PeriodStart, RangeFilter::new(self.period_start_from, self.period_start_to))
            .range(Column::PeriodEnd, RangeFilter::new(self.period_end_from, self.period_end_to))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMetricRequest {
    pub metric_type: Option<MetricType>,
    pub period: Option<MetricPeriod>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub value: Option<Decimal>,
    pub target: Option<Decimal>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMetricResponse {
    pub id: i32,
    pub metric_type: MetricType,
    pub period: MetricPeriod,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub value: Option<Decimal>,
    pub target: Option<Decimal>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub last_updated: DateTimeWithTimeZone,
}

impl From<company_metrics::Model> for CompanyMetricResponse {
    fn from(m: company_metrics::Model) -> Self {
        Self {
            id: m.id,
            metric_type: m.metric_type,
            period: m.period,
            period_start: m.period_start,
            period_end: m.period_end,
            value: m.value,
            target: m.target,
            unit: m.unit,
            notes: m.notes,
            last_updated: m.last_updated,
        }
    }
}

fn validate(request: &CompanyMetricRequest) -> HrResult<(MetricType, MetricPeriod, NaiveDate, NaiveDate)> {
    let mut v = Violations::new();
    v.check(request.metric_type.is_some(), "metricType", "metricType is required");
    v.check(request.period.is_some(), "period", "period is required");
    v.check(request.period_start.is_some(), "periodStart", "periodStart is required");
    v.check(request.period_end.is_some(), "periodEnd", "periodEnd is required");
    if let (Some(start), Some(end)) = (request.period_start, request.period_end) {
        v.check(end >= start, "periodEnd", "periodEnd must not be before periodStart");
    }
    v.amount(request.value, "value");
    v.amount(request.target, "target");
    v.max_len(request.unit.as_deref(), 50, "unit");
    v.max_len(request.notes.as_deref(), 2000, "notes");
    v.finish()?;
    match (request.metric_type, request.period, request.period_start, request.period_end) {
        (Some(kind), Some(period), Some(start), Some(end)) => Ok((kind, period, start, end)),
        _ => Err(HrError::invalid("request", "incomplete company metric")),
    }
}

pub async fn list(
    db: &DbPool,
    filter: &CompanyMetricFilter,
    page: PageRequest,
) -> HrResult<Page<CompanyMetricResponse>> {
    let select = filter
        .to_filter_set()
        .apply(company_metrics::Entity::find())
        .order_by_asc(company_metrics::Column::Id);
    Ok(fetch_page(db, select, page).await?.map(Into::into))
}

async fn find_model(db: &DbPool, id: i32) -> HrResult<company_metrics::Model> {
    company_metrics::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| HrError::not_found("CompanyMetric", id))
}

pub async fn get(db: &DbPool, id: i32) -> HrResult<CompanyMetricResponse> {
    Ok(find_model(db, id).await?.into())
}

pub async fn create(db: &DbPool, request: CompanyMetricRequest) -> HrResult<CompanyMetricResponse> {
    let (metric_type, period, start, end) = validate(&request)?;
    let model = company_metrics::ActiveModel {
        metric_type: Set(metric_type),
        period: Set(period),
        period_start: Set(start),
        period_end: Set(end),
        value: Set(request.value),
        target: Set(request.target),
        unit: Set(non_blank(request.unit)),
        notes: Set(non_blank(request.notes)),
        last_updated: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::debug!(metric_id = model.id, "company metric recorded");
    Ok(model.into())
}

pub async fn update(db: &DbPool, id: i32, request: CompanyMetricRequest) -> HrResult<CompanyMetricResponse> {
    let (metric_type, period, start, end) = validate(&request)?;
    let mut active = find_model(db, id).await?.into_active_model();
    active.metric_type = Set(metric_type);
    active.period = Set(period);
    active.period_start = Set(start);
    active.period_end = Set(end);
    active.value = Set(request.value);
    active.target = Set(request.target);
    active.unit = Set(non_blank(request.unit));
    active.notes = Set(non_blank(request.notes));
    active.last_updated = Set(now());
    Ok(active.update(db).await?.into())
}

pub async fn delete(db: &DbPool, id: i32) -> HrResult<bool> {
    let result = company_metrics::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{day, setup_db};

    fn metric(kind: MetricType, start: NaiveDate, end: NaiveDate) -> CompanyMetricRequest {
        CompanyMetricRequest {
            metric_type: Some(kind),
            period: Some(MetricPeriod::Monthly),
            period_start: Some(start),
            period_end: Some(end),
            value: Some(Decimal::new(425, 1)),
            unit: Some("%".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn period_start_range_bounds_are_inclusive() {
        let db = setup_db().await;
        for d in [9, 10, 15, 20, 21] {
            create(&db, metric(MetricType::Headcount, day(2024, 4, d), day(2024, 4, 28)))
                .await
                .unwrap();
        }
        let filter = CompanyMetricFilter {
            period_start_from: Some(day(2024, 4, 10)),
            period_start_to: Some(day(2024, 4, 20)),
            ..Default::default()
        };
        let page = list(&db, &filter, PageRequest::default()).await.unwrap();
        let starts: Vec<_> = page.content.iter().map(|m| m.period_start).collect();
        assert_eq!(starts, [day(2024, 4, 10), day(2024, 4, 15), day(2024, 4, 20)]);
    }

    #[tokio::test]
    async fn type_filter_with_no_other_criteria() {
        let db = setup_db().await;
        create(&db, metric(MetricType::Revenue, day(2024, 1, 1), day(2024, 1, 31))).await.unwrap();
        create(&db, metric(MetricType::TurnoverRate, day(2024, 1, 1), day(2024, 1, 31))).await.unwrap();
        let filter = CompanyMetricFilter {
            metric_type: Some(MetricType::TurnoverRate),
            ..Default::default()
        };
        let page = list(&db, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].metric_type, MetricType::TurnoverRate);
        assert_eq!(page.content[0].value, Some(Decimal::new(425, 1)));
    }

    #[tokio::test]
    async fn negative_values_are_rejected() {
        let db = setup_db().await;
        let mut bad = metric(MetricType::Profit, day(2024, 1, 1), day(2024, 1, 31));
        bad.target = Some(Decimal::new(-5, 0));
        let Err(HrError::Validation(fields)) = create(&db, bad).await else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("target"));
    }

    #[tokio::test]
    async fn update_replaces_and_delete_is_boolean() {
        let db = setup_db().await;
        let created = create(&db, metric(MetricType::Expense, day(2024, 2, 1), day(2024, 2, 29)))
            .await
            .unwrap();
        let mut change = metric(MetricType::Expense, day(2024, 2, 1), day(2024, 2, 29));
        change.unit = None;
        change.notes = Some("revised".into());
        let updated = update(&db, created.id, change).await.unwrap();
        assert_eq!(updated.unit, None);
        assert_eq!(updated.notes.as_deref(), Some("revised"));
        assert!(updated.last_updated >= created.last_updated);
        assert!(delete(&db, created.id).await.unwrap());
        assert!(!delete(&db, created.id).await.unwrap());
    }
}
