use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    RecipientId,
    SenderId,
    Title,
    Message,
    Kind,
    Priority,
    IsRead,
    ReadAt,
    CreatedAt,
    ExpiresAt,
    ActionUrl,
    ActionLabel,
}

#[derive(DeriveIden)]
enum SystemSettings {
    Table,
    Id,
    CompanyName,
    CompanyEmail,
    CompanyPhone,
    CompanyAddress,
    DefaultVacationDays,
    Currency,
    DateFormat,
    Theme,
    Timezone,
    EmailNotifications,
    NewEmployeeAlerts,
    SalaryUpdateAlerts,
    SystemMaintenance,
    AutoBackup,
    BackupFrequency,
    RetentionPeriod,
    PasswordMinLength,
    RequireSpecialChars,
    RequireNumbers,
    RequireUppercase,
    SessionTimeout,
    TwoFactorRequired,
    LoginAttempts,
    LockoutDuration,
    SmtpHost,
    SmtpPort,
    SmtpUsername,
    SmtpPassword,
    FromName,
    FromEmail,
    EnableSsl,
    CreatedBy,
    UpdatedBy,
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
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Notifications::RecipientId).integer().not_null())
                    .col(ColumnDef::new(Notifications::SenderId).integer())
                    .col(ColumnDef::new(Notifications::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Notifications::Message).string_len(1000).not_null())
                    .col(ColumnDef::new(Notifications::Kind).string_len(32).not_null().default("INFO"))
                    .col(ColumnDef::new(Notifications::Priority).string_len(16).not_null().default("NORMAL"))
                    .col(ColumnDef::new(Notifications::IsRead).boolean().not_null().default(false))
                    .col(ColumnDef::new(Notifications::ReadAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Notifications::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(Notifications::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Notifications::ActionUrl).string_len(100))
                    .col(ColumnDef::new(Notifications::ActionLabel).string_len(50))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_recipient")
                            .from(Notifications::Table, Notifications::RecipientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_sender")
                            .from(Notifications::Table, Notifications::SenderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_recipient_read")
                    .table(Notifications::Table)
                    .col(Notifications::RecipientId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SystemSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SystemSettings::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(SystemSettings::CompanyName).string_len(255).not_null())
                    .col(ColumnDef::new(SystemSettings::CompanyEmail).string_len(255).not_null())
                    .col(ColumnDef::new(SystemSettings::CompanyPhone).string_len(64))
                    .col(ColumnDef::new(SystemSettings::CompanyAddress).text())
                    .col(ColumnDef::new(SystemSettings::DefaultVacationDays).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::Currency).string_len(8).not_null())
                    .col(ColumnDef::new(SystemSettings::DateFormat).string_len(32).not_null())
                    .col(ColumnDef::new(SystemSettings::Theme).string_len(32).not_null())
                    .col(ColumnDef::new(SystemSettings::Timezone).string_len(64).not_null())
                    .col(ColumnDef::new(SystemSettings::EmailNotifications).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::NewEmployeeAlerts).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::SalaryUpdateAlerts).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::SystemMaintenance).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::AutoBackup).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::BackupFrequency).string_len(16).not_null())
                    .col(ColumnDef::new(SystemSettings::RetentionPeriod).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::PasswordMinLength).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::RequireSpecialChars).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::RequireNumbers).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::RequireUppercase).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::SessionTimeout).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::TwoFactorRequired).boolean().not_null())
                    .col(ColumnDef::new(SystemSettings::LoginAttempts).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::LockoutDuration).integer().not_null())
                    .col(ColumnDef::new(SystemSettings::SmtpHost).string_len(255))
                    .col(ColumnDef::new(SystemSettings::SmtpPort).integer())
                    .col(ColumnDef::new(SystemSettings::SmtpUsername).string_len(255))
                    .col(ColumnDef::new(SystemSettings::SmtpPassword).string_len(255))
                    .col(ColumnDef::new(SystemSettings::FromName).string_len(255))
                    .col(ColumnDef::new(SystemSettings::FromEmail).string_len(255))
                    .col(ColumnDef::new(SystemSettings::EnableSsl).boolean().not_null().default(true))
                    .col(ColumnDef::new(SystemSettings::CreatedBy).string_len(100).not_null())
                    .col(ColumnDef::new(SystemSettings::UpdatedBy).string_len(100).not_null())
                    .col(ColumnDef::new(SystemSettings::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .col(ColumnDef::new(SystemSettings::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SystemSettings::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Notifications::Table).to_owned()).await?;
        Ok(())
    }
}
