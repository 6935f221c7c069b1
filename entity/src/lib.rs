//! sea-orm entities for the HR suite schema.

pub mod company_metrics;
pub mod departments;
pub mod employees;
pub mod finance_reports;
pub mod leave_requests;
pub mod notifications;
pub mod system_settings;
pub mod users;

pub mod prelude {
    pub use super::company_metrics::Entity as CompanyMetric;
    pub use super::departments::Entity as Department;
    pub use super::employees::Entity as Employee;
    pub use super::finance_reports::Entity as FinanceReport;
    pub use super::leave_requests::Entity as LeaveRequest;
    pub use super::notifications::Entity as Notification;
    pub use super::system_settings::Entity as SystemSettings;
    pub use super::users::Entity as User;
}
