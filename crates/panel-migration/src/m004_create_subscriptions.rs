//! Миграция: создание таблицы subscriptions.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m004_create_subscriptions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PublicId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::Name).string().not_null())
                    .col(ColumnDef::new(Subscriptions::UserId).string().not_null())
                    .col(ColumnDef::new(Subscriptions::ClusterId).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::MaxConnections)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Subscriptions::BandwidthLimit).text().null())
                    .col(ColumnDef::new(Subscriptions::ExpiresAt).string().null())
                    .col(ColumnDef::new(Subscriptions::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Subscriptions::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .name("idx_subscriptions_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Subscriptions {
    Table,
    Id,
    PublicId,
    Name,
    UserId,
    ClusterId,
    Status,
    MaxConnections,
    BandwidthLimit,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
