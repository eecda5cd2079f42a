//! Сервис кластеров: CRUD.

use crate::error::AppError;
use crate::store::timestamp_now;
use panel_entities::clusters::{ActiveModel, Column, Entity as ClusterEntity, Model};
use panel_entities::nodes;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

pub struct ClusterData {
    pub name: String,
    pub cluster_type: Option<String>,
    pub description: Option<String>,
}

pub struct ClusterPatch {
    pub name: Option<String>,
    pub cluster_type: Option<String>,
    pub description: Option<String>,
}

/// Кластер вместе с числом узлов.
pub struct ClusterSummary {
    pub cluster: Model,
    pub node_count: u64,
}

pub async fn create_cluster(db: &DatabaseConnection, data: ClusterData) -> Result<Model, AppError> {
    if data.name.trim().is_empty() {
        return Err(AppError::BadRequest("name обязателен".into()));
    }
    ensure_name_free(db, &data.name, None).await?;

    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(data.name),
        cluster_type: Set(data.cluster_type.unwrap_or_else(|| "LOAD_BALANCE".to_string())),
        description: Set(data.description),
        created_at: Set(timestamp_now()),
    };
    Ok(model.insert(db).await?)
}

pub async fn list_clusters(db: &DatabaseConnection) -> Result<Vec<ClusterSummary>, AppError> {
    let clusters = ClusterEntity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let node_count = count_nodes(db, &cluster.id).await?;
        summaries.push(ClusterSummary {
            cluster,
            node_count,
        });
    }
    Ok(summaries)
}

pub async fn get_cluster(db: &DatabaseConnection, cluster_id: &str) -> Result<Model, AppError> {
    ClusterEntity::find_by_id(cluster_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Кластер не найден: {cluster_id}")))
}

pub async fn update_cluster(
    db: &DatabaseConnection,
    cluster_id: &str,
    patch: ClusterPatch,
) -> Result<Model, AppError> {
    let record = get_cluster(db, cluster_id).await?;
    let mut model: ActiveModel = record.into();

    if let Some(name) = patch.name {
        ensure_name_free(db, &name, Some(cluster_id)).await?;
        model.name = Set(name);
    }
    if let Some(cluster_type) = patch.cluster_type {
        model.cluster_type = Set(cluster_type);
    }
    if let Some(description) = patch.description {
        model.description = Set(Some(description));
    }
    Ok(model.update(db).await?)
}

/// Удалить кластер. Кластер с узлами не удаляется, чтобы узлы не осиротели.
pub async fn delete_cluster(db: &DatabaseConnection, cluster_id: &str) -> Result<(), AppError> {
    let record = get_cluster(db, cluster_id).await?;

    let node_count = count_nodes(db, cluster_id).await?;
    if node_count > 0 {
        return Err(AppError::Conflict(format!(
            "В кластере {} ещё {node_count} узлов",
            record.name
        )));
    }

    let model: ActiveModel = record.into();
    model.delete(db).await?;
    Ok(())
}

async fn count_nodes(db: &DatabaseConnection, cluster_id: &str) -> Result<u64, AppError> {
    Ok(nodes::Entity::find()
        .filter(nodes::Column::ClusterId.eq(cluster_id))
        .count(db)
        .await?)
}

async fn ensure_name_free(
    db: &DatabaseConnection,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    let existing = ClusterEntity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await?;
    match existing {
        Some(c) if Some(c.id.as_str()) != except_id => Err(AppError::Conflict(format!(
            "Кластер с именем {name} уже существует"
        ))),
        _ => Ok(()),
    }
}
