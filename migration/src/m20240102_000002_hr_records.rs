use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum LeaveRequests {
    Table,
    Id,
    EmployeeCode,
    EmployeeName,
    LeaveType,
    StartDate,
    EndDate,
    DaysRequested,
    Reason,
    Status,
    ApprovedBy,
    ApprovedAt,
    Comments,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FinanceReports {
    Table,
    Id,
    Title,
    ReportType,
    PeriodStart,
    PeriodEnd,
    Department,
    TotalRevenue,
    TotalExpenses,
    NetProfit,
    BudgetAllocated,
    BudgetUsed,
    PayrollCosts,
    OperationalCosts,
    Summary,
    Status,
    CreatedByName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CompanyMetrics {
    Table,
    Id,
    MetricType,
    Period,
    PeriodStart,
    PeriodEnd,
    Value,
    Target,
    Unit,
    Notes,
    LastUpdated,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LeaveRequests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LeaveRequests::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(LeaveRequests::EmployeeCode).string_len(20).not_null())
                    .col(ColumnDef::new(LeaveRequests::EmployeeName).string_len(101))
                    .col(ColumnDef::new(LeaveRequests::LeaveType).string_len(20).not_null())
                    .col(ColumnDef::new(LeaveRequests::StartDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequests::EndDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequests::DaysRequested).integer().not_null())
                    .col(ColumnDef::new(LeaveRequests::Reason).text().not_null())
                    .col(ColumnDef::new(LeaveRequests::Status).string_len(20).not_null().default("PENDING"))
                    .col(ColumnDef::new(LeaveRequests::ApprovedBy).string_len(100))
                    .col(ColumnDef::new(LeaveRequests::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(LeaveRequests::Comments).text())
                    .col(ColumnDef::new(LeaveRequests::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(LeaveRequests::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leave_requests_employee_code")
                    .table(LeaveRequests::Table)
                    .col(LeaveRequests::EmployeeCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FinanceReports::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FinanceReports::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(FinanceReports::Title).string_len(255).not_null())
                    .col(ColumnDef::new(FinanceReports::ReportType).string_len(20).not_null())
                    .col(ColumnDef::new(FinanceReports::PeriodStart).date().not_null())
                    .col(ColumnDef::new(FinanceReports::PeriodEnd).date().not_null())
                    .col(ColumnDef::new(FinanceReports::Department).string_len(100))
                    .col(ColumnDef::new(FinanceReports::TotalRevenue).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::TotalExpenses).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::NetProfit).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::BudgetAllocated).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::BudgetUsed).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::PayrollCosts).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::OperationalCosts).decimal_len(16, 4))
                    .col(ColumnDef::new(FinanceReports::Summary).text())
                    .col(ColumnDef::new(FinanceReports::Status).string_len(20).not_null().default("DRAFT"))
                    .col(ColumnDef::new(FinanceReports::CreatedByName).string_len(100))
                    .col(ColumnDef::new(FinanceReports::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(FinanceReports::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyMetrics::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CompanyMetrics::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(CompanyMetrics::MetricType).string_len(30).not_null())
                    .col(ColumnDef::new(CompanyMetrics::Period).string_len(20).not_null())
                    .col(ColumnDef::new(CompanyMetrics::PeriodStart).date().not_null())
                    .col(ColumnDef::new(CompanyMetrics::PeriodEnd).date().not_null())
                    .col(ColumnDef::new(CompanyMetrics::Value).decimal_len(16, 4))
                    .col(ColumnDef::new(CompanyMetrics::Target).decimal_len(16, 4))
                    .col(ColumnDef::new(CompanyMetrics::Unit).string_len(32))
                    .col(ColumnDef::new(CompanyMetrics::Notes).text())
                    .col(ColumnDef::new(CompanyMetrics::LastUpdated).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CompanyMetrics::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FinanceReports::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LeaveRequests::Table).to_owned()).await?;
        Ok(())
    }
}
