//! Миграция: создание таблицы traffic_records.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m005_create_traffic_records"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrafficRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrafficRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrafficRecords::NodeId).string().not_null())
                    .col(ColumnDef::new(TrafficRecords::UserId).string().null())
                    .col(
                        ColumnDef::new(TrafficRecords::Upload)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrafficRecords::Download)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(TrafficRecords::Timestamp).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(TrafficRecords::Table)
                    .col(TrafficRecords::NodeId)
                    .col(TrafficRecords::Timestamp)
                    .name("idx_traffic_records_node_ts")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(TrafficRecords::Table)
                    .col(TrafficRecords::UserId)
                    .name("idx_traffic_records_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrafficRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TrafficRecords {
    Table,
    Id,
    NodeId,
    UserId,
    Upload,
    Download,
    Timestamp,
}
