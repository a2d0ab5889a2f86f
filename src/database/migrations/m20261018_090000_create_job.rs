use sea_orm_migration::{
    prelude::*,
    schema::{boolean, integer, string, string_len, uuid},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

// Enum columns are plain strings so the schema works on SQLite and Postgres alike.
const ENUM_LEN: u32 = 16;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(uuid(Job::Id).primary_key())
                    .col(string(Job::Name))
                    .col(string(Job::TemplateName))
                    .col(string_len(Job::ScheduleKind, ENUM_LEN))
                    .col(
                        ColumnDef::new(Job::RunAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Job::CronExpression).string_len(128).null())
                    .col(string_len(Job::RecipientSource, ENUM_LEN))
                    .col(ColumnDef::new(Job::Recipients).json().null())
                    .col(ColumnDef::new(Job::RecipientFilter).json().null())
                    .col(
                        ColumnDef::new(Job::NextRunAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(string_len(Job::Status, ENUM_LEN).default("scheduled"))
                    .col(integer(Job::RetryCount).default(0))
                    .col(integer(Job::MaxRetries).default(3))
                    .col(ColumnDef::new(Job::LastError).text().null())
                    .col(boolean(Job::Cancelled).default(false))
                    .col(
                        ColumnDef::new(Job::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Job::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobExecution::Table)
                    .if_not_exists()
                    .col(uuid(JobExecution::Id).primary_key())
                    .col(uuid(JobExecution::JobId))
                    .col(string_len(JobExecution::Status, ENUM_LEN).default("pending"))
                    .col(integer(JobExecution::Attempt).default(1))
                    .col(
                        ColumnDef::new(JobExecution::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(JobExecution::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(JobExecution::Error).text().null())
                    .col(integer(JobExecution::EmailsSent).default(0))
                    .col(ColumnDef::new(JobExecution::Details).json().null())
                    .col(
                        ColumnDef::new(JobExecution::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-job_execution-job_id")
                            .from(JobExecution::Table, JobExecution::JobId)
                            .to(Job::Table, Job::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The due-job poll filters and orders on next_run_at
        manager
            .create_index(
                Index::create()
                    .name("idx-job-next_run_at")
                    .table(Job::Table)
                    .col(Job::NextRunAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-job_execution-job_id")
                    .table(JobExecution::Table)
                    .col(JobExecution::JobId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobExecution::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Job::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Job {
    Table,
    Id,
    Name,
    TemplateName,
    ScheduleKind,
    RunAt,
    CronExpression,
    RecipientSource,
    Recipients,
    RecipientFilter,
    NextRunAt,
    Status,
    RetryCount,
    MaxRetries,
    LastError,
    Cancelled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JobExecution {
    Table,
    Id,
    JobId,
    Status,
    Attempt,
    StartedAt,
    FinishedAt,
    Error,
    EmailsSent,
    Details,
    CreatedAt,
}
