//! HR vertical slice.
//!
//! Services are plain async functions over a [`platform_db::DbPool`]. Callers are expected
//! to have passed the capability gate already; functions that depend on who
//! is asking (notification ownership, role changes) take the caller's id or
//! role explicitly.

pub mod departments;
pub mod employees;
pub mod error;
pub mod events;
pub mod finance;
pub mod leave;
pub mod metrics;
pub mod notifications;
pub mod settings;
pub mod users;

#[cfg(test)]
mod test_support;

pub use error::{HrError, HrResult};

pub(crate) fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
    chrono::Utc::now().fixed_offset()
}

/// Reduces optional text to `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
