//! Административный сервис: сводная статистика панели.

use crate::error::AppError;
use panel_entities::enums::NodeStatus;
use panel_entities::{clusters, nodes, users};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

/// Статистика панели.
pub struct Stats {
    pub total_users: u64,
    pub total_nodes: u64,
    pub total_clusters: u64,
    pub online_nodes: u64,
    pub offline_nodes: u64,
}

pub async fn get_stats(db: &DatabaseConnection) -> Result<Stats, AppError> {
    let total_users = users::Entity::find().count(db).await?;
    let total_nodes = nodes::Entity::find().count(db).await?;
    let total_clusters = clusters::Entity::find().count(db).await?;
    let online_nodes = nodes::Entity::find()
        .filter(nodes::Column::Status.eq(NodeStatus::Online))
        .count(db)
        .await?;

    Ok(Stats {
        total_users,
        total_nodes,
        total_clusters,
        online_nodes,
        offline_nodes: total_nodes - online_nodes,
    })
}
