//! 提醒查询索引
//!
//! Worker 与 SSE 都按 (status, scheduled_time) 过滤，单列索引不够用。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reminders_status_time")
                    .table(Reminders::Table)
                    .col(Reminders::Status)
                    .col(Reminders::ScheduledTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reminders_medication_id")
                    .table(Reminders::Table)
                    .col(Reminders::MedicationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_reminders_medication_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_reminders_status_time").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reminders {
    Table,
    MedicationId,
    ScheduledTime,
    Status,
}
