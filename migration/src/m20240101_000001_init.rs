use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    Enabled,
    CreatedAt,
    UpdatedAt,
    LastLogin,
}

#[derive(DeriveIden)]
enum Departments {
    Table,
    Id,
    Name,
    Description,
    HeadEmployeeId,
    BudgetAllocated,
    BudgetSpent,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    FirstName,
    LastName,
    EmployeeCode,
    Department,
    DepartmentId,
    Position,
    Phone,
    Address,
    HireDate,
    BirthDate,
    Salary,
    Bonus,
    AnnualVacationDays,
    Email,
    Status,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Users::Username).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Users::Email).string_len(100).not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Role).string_len(32).not_null().default("EMPLOYEE"))
                    .col(ColumnDef::new(Users::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(Index::create().name("idx_users_role").table(Users::Table).col(Users::Role).to_owned())
            .await?;

        // head_employee_id gets its foreign key once employees exists.
        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Departments::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Departments::Name).string_len(100).not_null().unique_key())
                    .col(ColumnDef::new(Departments::Description).string_len(500))
                    .col(ColumnDef::new(Departments::HeadEmployeeId).integer())
                    .col(ColumnDef::new(Departments::BudgetAllocated).decimal_len(16, 4).not_null().default(0))
                    .col(ColumnDef::new(Departments::BudgetSpent).decimal_len(16, 4).not_null().default(0))
                    .col(ColumnDef::new(Departments::Status).string_len(20).not_null().default("ACTIVE"))
                    .col(ColumnDef::new(Departments::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(Departments::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employees::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Employees::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(50).not_null())
                    .col(ColumnDef::new(Employees::EmployeeCode).string_len(20).not_null().unique_key())
                    .col(ColumnDef::new(Employees::Department).string_len(100))
                    .col(ColumnDef::new(Employees::DepartmentId).integer())
                    .col(ColumnDef::new(Employees::Position).string_len(100))
                    .col(ColumnDef::new(Employees::Phone).string_len(15))
                    .col(ColumnDef::new(Employees::Address).string_len(200))
                    .col(ColumnDef::new(Employees::HireDate).date().not_null())
                    .col(ColumnDef::new(Employees::BirthDate).date())
                    .col(ColumnDef::new(Employees::Salary).decimal_len(16, 4))
                    .col(ColumnDef::new(Employees::Bonus).decimal_len(16, 4))
                    .col(ColumnDef::new(Employees::AnnualVacationDays).integer())
                    .col(ColumnDef::new(Employees::Email).string_len(100))
                    .col(ColumnDef::new(Employees::Status).string_len(20).not_null().default("ACTIVE"))
                    .col(ColumnDef::new(Employees::UserId).integer().unique_key())
                    .col(ColumnDef::new(Employees::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(Employees::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_department")
                            .from(Employees::Table, Employees::DepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_user")
                            .from(Employees::Table, Employees::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_department_id")
                    .table(Employees::Table)
                    .col(Employees::DepartmentId)
                    .to_owned(),
            )
            .await?;

        // SQLite cannot add constraints to an existing table; the department
        // service clears head references itself, so tests lose nothing.
        if manager.get_database_backend() == DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_departments_head_employee")
                        .from(Departments::Table, Departments::HeadEmployeeId)
                        .to(Employees::Table, Employees::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                        .on_update(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == DatabaseBackend::Postgres {
            manager
                .drop_foreign_key(
                    ForeignKey::drop()
                        .name("fk_departments_head_employee")
                        .table(Departments::Table)
                        .to_owned(),
                )
                .await?;
        }
        manager.drop_table(Table::drop().table(Employees::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Departments::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await?;
        Ok(())
    }
}
