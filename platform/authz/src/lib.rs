//! Authorization primitives for the HR suite.
//!
//! Every account carries exactly one [`Role`]. A role resolves to a fixed set
//! of [`Capability`] tokens through a static table, and roles are partially
//! ordered by the edge table in [`hierarchy`]. Nothing in this crate performs
//! I/O or holds mutable state.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod hierarchy;

pub use hierarchy::{directly_dominates, includes, reachable};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("role {role} lacks capability {capability}")]
    Denied { role: Role, capability: Capability },
    #[error("role {role} does not include role {required}")]
    Insufficient { role: Role, required: Role },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Hr,
    FinanceManager,
    DepartmentHead,
    Manager,
    ItSupport,
    Employee,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Hr,
        Role::FinanceManager,
        Role::DepartmentHead,
        Role::Manager,
        Role::ItSupport,
        Role::Employee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Hr => "HR",
            Role::FinanceManager => "FINANCE_MANAGER",
            Role::DepartmentHead => "DEPARTMENT_HEAD",
            Role::Manager => "MANAGER",
            Role::ItSupport => "IT_SUPPORT",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Human readable label used in notifications and listings.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Administrator",
            Role::Admin => "Administrator",
            Role::Hr => "Human Resources",
            Role::FinanceManager => "Finance Manager",
            Role::DepartmentHead => "Department Head",
            Role::Manager => "Manager",
            Role::ItSupport => "IT Support",
            Role::Employee => "Employee",
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        capabilities(self)
    }

    pub fn has(self, capability: Capability) -> bool {
        capabilities(self).contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownRole(value.to_string()))
    }
}

/// One permitted action class, checked per endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    EmployeeRead,
    EmployeeWrite,
    EmployeeDelete,
    EmployeeCreate,
    DepartmentRead,
    DepartmentWrite,
    DepartmentDelete,
    DepartmentCreate,
    SalaryRead,
    SalaryWrite,
    BudgetRead,
    BudgetWrite,
    SystemConfig,
    UserManagement,
    ReportsAccess,
    AuditLogs,
    SystemMaintenance,
    BackupRestore,
    SecuritySettings,
    ProfileRead,
    ProfileWrite,
    SuperAdminAccess,
}

impl Capability {
    pub fn token(self) -> &'static str {
        match self {
            Capability::EmployeeRead => "EMPLOYEE_READ",
            Capability::EmployeeWrite => "EMPLOYEE_WRITE",
            Capability::EmployeeDelete => "EMPLOYEE_DELETE",
            Capability::EmployeeCreate => "EMPLOYEE_CREATE",
            Capability::DepartmentRead => "DEPARTMENT_READ",
            Capability::DepartmentWrite => "DEPARTMENT_WRITE",
            Capability::DepartmentDelete => "DEPARTMENT_DELETE",
            Capability::DepartmentCreate => "DEPARTMENT_CREATE",
            Capability::SalaryRead => "SALARY_READ",
            Capability::SalaryWrite => "SALARY_WRITE",
            Capability::BudgetRead => "BUDGET_READ",
            Capability::BudgetWrite => "BUDGET_WRITE",
            Capability::SystemConfig => "SYSTEM_CONFIG",
            Capability::UserManagement => "USER_MANAGEMENT",
            Capability::ReportsAccess => "REPORTS_ACCESS",
            Capability::AuditLogs => "AUDIT_LOGS",
            Capability::SystemMaintenance => "SYSTEM_MAINTENANCE",
            Capability::BackupRestore => "BACKUP_RESTORE",
            Capability::SecuritySettings => "SECURITY_SETTINGS",
            Capability::ProfileRead => "PROFILE_READ",
            Capability::ProfileWrite => "PROFILE_WRITE",
            Capability::SuperAdminAccess => "SUPER_ADMIN_ACCESS",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

use Capability::*;

const STANDARD: [Capability; 21] = [
    EmployeeRead,
    EmployeeWrite,
    EmployeeDelete,
    EmployeeCreate,
    DepartmentRead,
    DepartmentWrite,
    DepartmentDelete,
    DepartmentCreate,
    SalaryRead,
    SalaryWrite,
    BudgetRead,
    BudgetWrite,
    SystemConfig,
    UserManagement,
    ReportsAccess,
    AuditLogs,
    SystemMaintenance,
    BackupRestore,
    SecuritySettings,
    ProfileRead,
    ProfileWrite,
];

const SUPER_ADMIN: [Capability; 22] = [
    EmployeeRead,
    EmployeeWrite,
    EmployeeDelete,
    EmployeeCreate,
    DepartmentRead,
    DepartmentWrite,
    DepartmentDelete,
    DepartmentCreate,
    SalaryRead,
    SalaryWrite,
    BudgetRead,
    BudgetWrite,
    SystemConfig,
    UserManagement,
    ReportsAccess,
    AuditLogs,
    SystemMaintenance,
    BackupRestore,
    SecuritySettings,
    ProfileRead,
    ProfileWrite,
    SuperAdminAccess,
];

const HR: [Capability; 8] = [
    EmployeeRead,
    EmployeeWrite,
    EmployeeCreate,
    DepartmentRead,
    UserManagement,
    ReportsAccess,
    ProfileRead,
    ProfileWrite,
];

const FINANCE_MANAGER: [Capability; 8] = [
    EmployeeRead,
    SalaryRead,
    SalaryWrite,
    BudgetRead,
    BudgetWrite,
    ReportsAccess,
    ProfileRead,
    ProfileWrite,
];

const DEPARTMENT_HEAD: [Capability; 7] = [
    EmployeeRead,
    EmployeeWrite,
    DepartmentRead,
    DepartmentWrite,
    ReportsAccess,
    ProfileRead,
    ProfileWrite,
];

const MANAGER: [Capability; 5] = [
    EmployeeRead,
    DepartmentRead,
    ReportsAccess,
    ProfileRead,
    ProfileWrite,
];

const IT_SUPPORT: [Capability; 7] = [
    EmployeeRead,
    SystemMaintenance,
    BackupRestore,
    SecuritySettings,
    AuditLogs,
    ProfileRead,
    ProfileWrite,
];

const EMPLOYEE: [Capability; 2] = [ProfileRead, ProfileWrite];

/// Capability row for a role.
pub fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::SuperAdmin => &SUPER_ADMIN,
        Role::Admin => &STANDARD,
        Role::Hr => &HR,
        Role::FinanceManager => &FINANCE_MANAGER,
        Role::DepartmentHead => &DEPARTMENT_HEAD,
        Role::Manager => &MANAGER,
        Role::ItSupport => &IT_SUPPORT,
        Role::Employee => &EMPLOYEE,
    }
}

/// Authority strings handed to the gate: `ROLE_<NAME>` followed by every
/// capability token of the role.
pub fn authorities(role: Role) -> Vec<String> {
    let caps = capabilities(role);
    let mut out = Vec::with_capacity(caps.len() + 1);
    out.push(format!("ROLE_{}", role.as_str()));
    out.extend(caps.iter().map(|cap| cap.token().to_string()));
    out
}

pub fn require(role: Role, capability: Capability) -> Result<(), AuthzError> {
    if role.has(capability) {
        Ok(())
    } else {
        Err(AuthzError::Denied { role, capability })
    }
}

/// Passes when `role` holds at least one of `any_of`.
pub fn require_any(role: Role, any_of: &[Capability]) -> Result<(), AuthzError> {
    match any_of.iter().find(|cap| role.has(**cap)) {
        Some(_) => Ok(()),
        None => Err(AuthzError::Denied {
            role,
            capability: any_of.first().copied().unwrap_or(SuperAdminAccess),
        }),
    }
}

pub fn require_role(role: Role, required: Role) -> Result<(), AuthzError> {
    if includes(role, required) {
        Ok(())
    } else {
        Err(AuthzError::Insufficient { role, required })
    }
}
