//! Миграции схемы панели.

pub use sea_orm_migration::prelude::*;

mod m001_create_clusters;
mod m002_create_nodes;
mod m003_create_users;
mod m004_create_subscriptions;
mod m005_create_traffic_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_clusters::Migration),
            Box::new(m002_create_nodes::Migration),
            Box::new(m003_create_users::Migration),
            Box::new(m004_create_subscriptions::Migration),
            Box::new(m005_create_traffic_records::Migration),
        ]
    }
}
