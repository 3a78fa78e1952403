//! 初始表结构
//!
//! - users: 账号与通知偏好
//! - medications: 药品信息（按用户）
//! - reminders: 每次服药提醒
//! - push_subscriptions: Web Push 订阅

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 users 表
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::HashedPassword)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::FullName).string_len(200).null())
                    .col(ColumnDef::new(Users::PhoneNumber).string_len(32).null())
                    .col(
                        ColumnDef::new(Users::EmailNotifications)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 medications 表
        manager
            .create_table(
                Table::create()
                    .table(Medications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Medications::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Medications::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(Medications::Name)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Medications::Dosage)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Medications::Frequency)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Medications::Instructions).text().not_null())
                    .col(
                        ColumnDef::new(Medications::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Medications::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Medications::Priority)
                            .string_len(16)
                            .not_null()
                            .default("NORMAL"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_medications_user_id")
                            .from(Medications::Table, Medications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 reminders 表
        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reminders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reminders::MedicationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reminders::ScheduledTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reminders::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminders_medication_id")
                            .from(Reminders::Table, Reminders::MedicationId)
                            .to(Medications::Table, Medications::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 push_subscriptions 表
        manager
            .create_table(
                Table::create()
                    .table(PushSubscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushSubscriptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PushSubscriptions::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PushSubscriptions::Endpoint)
                            .string_len(2000)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PushSubscriptions::P256dhKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PushSubscriptions::AuthKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PushSubscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_push_subscriptions_user_id")
                            .from(PushSubscriptions::Table, PushSubscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 用户药品列表索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_medications_user_id")
                    .table(Medications::Table)
                    .col(Medications::UserId)
                    .to_owned(),
            )
            .await?;

        // Worker 按时间扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reminders_scheduled_time")
                    .table(Reminders::Table)
                    .col(Reminders::ScheduledTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_push_subscriptions_user_id")
                    .table(PushSubscriptions::Table)
                    .col(PushSubscriptions::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_push_subscriptions_user_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_reminders_scheduled_time").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_medications_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PushSubscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Medications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    HashedPassword,
    IsActive,
    FullName,
    PhoneNumber,
    EmailNotifications,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Medications {
    Table,
    Id,
    UserId,
    Name,
    Dosage,
    Frequency,
    Instructions,
    StartDate,
    EndDate,
    Priority,
}

#[derive(DeriveIden)]
enum Reminders {
    Table,
    Id,
    MedicationId,
    ScheduledTime,
    Status,
}

#[derive(DeriveIden)]
enum PushSubscriptions {
    Table,
    Id,
    UserId,
    Endpoint,
    #[sea_orm(iden = "p256dh_key")]
    P256dhKey,
    AuthKey,
    CreatedAt,
}
