//! Миграция: создание таблицы clusters.

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_create_clusters"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clusters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clusters::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Clusters::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Clusters::ClusterType)
                            .string()
                            .not_null()
                            .default("LOAD_BALANCE"),
                    )
                    .col(ColumnDef::new(Clusters::Description).string().null())
                    .col(ColumnDef::new(Clusters::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Поиск «самого раннего» кластера при импорте
        manager
            .create_index(
                Index::create()
                    .table(Clusters::Table)
                    .col(Clusters::CreatedAt)
                    .name("idx_clusters_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clusters::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Clusters {
    Table,
    Id,
    Name,
    ClusterType,
    Description,
    CreatedAt,
}
