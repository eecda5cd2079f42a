//! Миграция: создание таблицы nodes.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_create_nodes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Nodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Nodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Nodes::Name).string().not_null())
                    .col(ColumnDef::new(Nodes::Hostname).string().not_null())
                    .col(ColumnDef::new(Nodes::IpAddress).string().not_null())
                    .col(ColumnDef::new(Nodes::Port).integer().null())
                    .col(
                        ColumnDef::new(Nodes::ApiPort)
                            .integer()
                            .not_null()
                            .default(8081),
                    )
                    .col(ColumnDef::new(Nodes::Token).string().not_null())
                    .col(
                        ColumnDef::new(Nodes::Status)
                            .string()
                            .not_null()
                            .default("OFFLINE"),
                    )
                    .col(ColumnDef::new(Nodes::Version).string().null())
                    .col(ColumnDef::new(Nodes::Country).string().null())
                    .col(ColumnDef::new(Nodes::City).string().null())
                    .col(ColumnDef::new(Nodes::ClusterId).string().not_null())
                    .col(ColumnDef::new(Nodes::LastHeartbeat).string().null())
                    .col(ColumnDef::new(Nodes::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Индекс по cluster_id для выборки узлов кластера
        manager
            .create_index(
                Index::create()
                    .table(Nodes::Table)
                    .col(Nodes::ClusterId)
                    .name("idx_nodes_cluster_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Nodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Nodes {
    Table,
    Id,
    Name,
    Hostname,
    IpAddress,
    Port,
    ApiPort,
    Token,
    Status,
    Version,
    Country,
    City,
    ClusterId,
    LastHeartbeat,
    CreatedAt,
}
