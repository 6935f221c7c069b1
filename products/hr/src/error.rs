use std::{collections::BTreeMap, fmt::Display};

use platform_api::ApiError;
use platform_authn::AuthnError;
use platform_authz::AuthzError;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

pub type HrResult<T> = Result<T, HrError>;

/// Exclusive bound on amounts stored in `decimal(16, 4)` columns.
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

#[derive(Debug, Error)]
pub enum HrError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Duplicate(String),
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error(transparent)]
    Authz(#[from] AuthzError),
    #[error(transparent)]
    Authn(#[from] AuthnError),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl HrError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(BTreeMap::from([(field.into(), message.into())]))
    }
}

/// Accumulates field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub(crate) struct Violations(BTreeMap<String, String>);

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub(crate) fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    pub(crate) fn required(&mut self, value: &str, field: &str) {
        self.check(!value.trim().is_empty(), field, format!("{field} is required"));
    }

    pub(crate) fn max_len(&mut self, value: Option<&str>, max: usize, field: &str) {
        if let Some(value) = value {
            self.check(
                value.chars().count() <= max,
                field,
                format!("{field} must be at most {max} characters"),
            );
        }
    }

    pub(crate) fn in_range(&mut self, value: Option<i32>, min: i32, max: i32, field: &str) {
        if let Some(value) = value {
            self.check(
                (min..=max).contains(&value),
                field,
                format!("{field} must be between {min} and {max}"),
            );
        }
    }

    /// Any sign, but must fit a `decimal(16, 4)` column.
    pub(crate) fn magnitude(&mut self, value: Option<Decimal>, field: &str) {
        if let Some(value) = value {
            self.check(
                value.abs() < AMOUNT_LIMIT,
                field,
                format!("{field} must be less than {AMOUNT_LIMIT} in magnitude"),
            );
        }
    }

    /// Non-negative and within the column range.
    pub(crate) fn amount(&mut self, value: Option<Decimal>, field: &str) {
        if value.is_some_and(|v| v.is_sign_negative() && !v.is_zero()) {
            self.add(field, format!("{field} must not be negative"));
        }
        self.magnitude(value, field);
    }

    pub(crate) fn finish(self) -> HrResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(HrError::Validation(self.0))
        }
    }
}

impl From<HrError> for ApiError {
    fn from(err: HrError) -> Self {
        match err {
            HrError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            HrError::Duplicate(message) => ApiError::BadRequest(message),
            HrError::Validation(fields) => ApiError::Validation(fields),
            HrError::Forbidden(message) => ApiError::Forbidden(message),
            HrError::Conflict(message) => ApiError::Conflict(message),
            HrError::InvalidCredentials | HrError::AccountDisabled => {
                ApiError::Unauthorized(err.to_string())
            }
            HrError::Authz(AuthzError::UnknownRole(role)) => {
                ApiError::internal(anyhow::anyhow!("stored role `{role}` is not recognised"))
            }
            HrError::Authz(inner) => ApiError::Forbidden(inner.to_string()),
            HrError::Authn(AuthnError::WeakPassword(message)) => {
                ApiError::field("password", message)
            }
            HrError::Authn(inner) => ApiError::internal(inner.into()),
            HrError::Db(inner) => ApiError::internal(inner.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = HrError::not_found("Employee", 42);
        assert_eq!(err.to_string(), "Employee not found with id: 42");
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }

    #[test]
    fn violations_keep_first_message_per_field() {
        let mut v = Violations::new();
        v.required("", "firstName");
        v.add("firstName", "second message");
        v.in_range(Some(400), 0, 365, "defaultVacationDays");
        v.in_range(None, 0, 365, "retentionPeriod");
        let Err(HrError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["firstName"], "firstName is required");
        assert_eq!(
            fields["defaultVacationDays"],
            "defaultVacationDays must be between 0 and 365"
        );
    }

    #[test]
    fn amounts_must_fit_the_column() {
        assert_eq!(AMOUNT_LIMIT, Decimal::new(1_000_000_000_000, 0));
        let mut v = Violations::new();
        v.amount(Some(Decimal::new(999_999_999_999_9999, 4)), "salary");
        v.amount(Some(Decimal::ZERO), "bonus");
        v.magnitude(Some(Decimal::new(-500, 0)), "netProfit");
        assert!(v.finish().is_ok());

        let mut v = Violations::new();
        v.amount(Some(Decimal::new(1_000_000_000_000, 0)), "salary");
        v.amount(Some(Decimal::new(-1, 2)), "bonus");
        v.magnitude(Some(Decimal::new(-1_000_000_000_000, 0)), "netProfit");
        let Err(HrError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["bonus"], "bonus must not be negative");
        assert!(fields["salary"].starts_with("salary must be less than"));
        assert!(fields.contains_key("netProfit"));
    }

    #[test]
    fn database_errors_are_internal() {
        let api = ApiError::from(HrError::Db(DbErr::Custom("boom".into())));
        assert!(matches!(api, ApiError::Internal(_)));
        let weak = ApiError::from(HrError::Authn(AuthnError::WeakPassword("requires a digit".into())));
        assert!(matches!(weak, ApiError::Validation(_)));
    }
}
