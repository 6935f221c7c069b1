//! Optional-predicate filter builder.
//!
//! Each criterion is independently present or absent. Absent criteria add
//! nothing to the query; present ones are conjoined. Composition never fails:
//! malformed input is rejected while deserializing the request.

use sea_orm::{ColumnTrait, Condition, QueryFilter, Value, sea_query::SimpleExpr};
use serde::Deserialize;

/// Exact-match criterion. `None` matches every row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EqFilter<T>(Option<T>);

impl<T> EqFilter<T> {
    pub fn new(value: Option<T>) -> Self {
        Self(value)
    }

    pub fn any() -> Self {
        Self(None)
    }

    pub fn value(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    pub fn matches(&self, candidate: &T) -> bool
    where
        T: PartialEq,
    {
        self.0.as_ref().is_none_or(|value| value == candidate)
    }

    pub fn condition<C>(self, column: C) -> Option<SimpleExpr>
    where
        C: ColumnTrait,
        T: Into<Value>,
    {
        self.0.map(|value| column.eq(value))
    }
}

impl EqFilter<String> {
    /// Blank or whitespace-only input counts as absent.
    pub fn text(value: Option<String>) -> Self {
        Self(value.and_then(|raw| {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }))
    }
}

impl<T> From<Option<T>> for EqFilter<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

/// Inclusive bounds, each optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RangeFilter<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for RangeFilter<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T> RangeFilter<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn between(min: T, max: T) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn at_least(min: T) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: T) -> Self {
        Self::new(None, Some(max))
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialOrd,
    {
        self.min.as_ref().is_none_or(|min| value >= min)
            && self.max.as_ref().is_none_or(|max| value <= max)
    }

    pub fn condition<C>(self, column: C) -> Option<SimpleExpr>
    where
        C: ColumnTrait,
        T: Into<Value>,
    {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(column.between(min, max)),
            (Some(min), None) => Some(column.gte(min)),
            (None, Some(max)) => Some(column.lte(max)),
            (None, None) => None,
        }
    }
}

/// Collects the active predicates of one list request.
#[derive(Clone, Debug)]
pub struct FilterSet {
    condition: Condition,
    active: usize,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self {
            condition: Condition::all(),
            active: 0,
        }
    }

    pub fn eq<C, T>(self, column: C, filter: EqFilter<T>) -> Self
    where
        C: ColumnTrait,
        T: Into<Value>,
    {
        self.push(filter.condition(column))
    }

    pub fn range<C, T>(self, column: C, filter: RangeFilter<T>) -> Self
    where
        C: ColumnTrait,
        T: Into<Value>,
    {
        self.push(filter.condition(column))
    }

    /// Adds an arbitrary predicate; `None` is ignored.
    pub fn push(mut self, expr: Option<SimpleExpr>) -> Self {
        if let Some(expr) = expr {
            self.condition = self.condition.add(expr);
            self.active += 1;
        }
        self
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn into_condition(self) -> Condition {
        self.condition
    }

    /// Applies the conjunction to `query`. An empty set leaves it untouched.
    pub fn apply<Q: QueryFilter>(self, query: Q) -> Q {
        if self.is_empty() {
            query
        } else {
            query.filter(self.condition)
        }
    }
}
