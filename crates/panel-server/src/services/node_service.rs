//! Сервис узлов: регистрация, правка, перенос между кластерами, heartbeat
//! агента, состояние, удаление.

use crate::error::AppError;
use crate::store::timestamp_now;
use chrono::Utc;
use panel_entities::enums::NodeStatus;
use panel_entities::nodes::{ActiveModel, Column, Entity as NodeEntity, Model};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

/// Узел считается живым, если heartbeat был не позже 5 минут назад.
pub const HEARTBEAT_TTL_SECS: i64 = 300;

/// Данные для создания узла.
pub struct NewNode {
    pub name: String,
    pub hostname: Option<String>,
    pub ip_address: String,
    pub port: Option<i32>,
    pub api_port: Option<i32>,
    pub token: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cluster_id: String,
}

/// Изменяемые поля узла. `None` не трогает поле.
#[derive(Default)]
pub struct NodePatch {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<i32>,
    pub api_port: Option<i32>,
    pub status: Option<NodeStatus>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cluster_id: Option<String>,
}

/// Данные heartbeat от агента.
pub struct HeartbeatData {
    pub node_id: String,
    pub status: NodeStatus,
    pub version: Option<String>,
}

/// Состояние узла для мониторинга.
pub struct NodeHealth {
    pub node: Model,
    pub healthy: bool,
}

pub async fn create_node(db: &DatabaseConnection, data: NewNode) -> Result<Model, AppError> {
    if data.name.is_empty() || data.ip_address.is_empty() {
        return Err(AppError::BadRequest("name и ipAddress обязательны".into()));
    }
    if let Some(port) = data.port {
        check_port(port)?;
    }
    super::cluster_service::get_cluster(db, &data.cluster_id).await?;

    let now = timestamp_now();
    let hostname = data.hostname.unwrap_or_else(|| {
        format!(
            "{}-{}",
            data.name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"),
            Utc::now().timestamp_millis()
        )
    });

    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(data.name),
        hostname: Set(hostname),
        ip_address: Set(data.ip_address),
        port: Set(Some(data.port.unwrap_or(443))),
        api_port: Set(data.api_port.unwrap_or(8081)),
        token: Set(data.token.unwrap_or_else(|| Uuid::new_v4().to_string())),
        status: Set(NodeStatus::Offline),
        version: Set(None),
        country: Set(data.country),
        city: Set(data.city),
        cluster_id: Set(data.cluster_id),
        last_heartbeat: Set(None),
        created_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn list_nodes(db: &DatabaseConnection) -> Result<Vec<Model>, AppError> {
    let nodes = NodeEntity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?;
    Ok(nodes)
}

pub async fn get_node(db: &DatabaseConnection, node_id: &str) -> Result<Model, AppError> {
    NodeEntity::find_by_id(node_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Узел не найден: {node_id}")))
}

pub async fn update_node(
    db: &DatabaseConnection,
    node_id: &str,
    patch: NodePatch,
) -> Result<Model, AppError> {
    let record = get_node(db, node_id).await?;
    let mut model: ActiveModel = record.into();

    if let Some(name) = patch.name.filter(|n| !n.is_empty()) {
        model.name = Set(name);
    }
    if let Some(hostname) = patch.hostname {
        model.hostname = Set(hostname);
    }
    if let Some(ip_address) = patch.ip_address.filter(|ip| !ip.is_empty()) {
        model.ip_address = Set(ip_address);
    }
    if let Some(port) = patch.port {
        check_port(port)?;
        model.port = Set(Some(port));
    }
    if let Some(api_port) = patch.api_port {
        check_port(api_port)?;
        model.api_port = Set(api_port);
    }
    if let Some(status) = patch.status {
        model.status = Set(status);
    }
    if let Some(country) = patch.country {
        model.country = Set(Some(country));
    }
    if let Some(city) = patch.city {
        model.city = Set(Some(city));
    }
    if let Some(cluster_id) = patch.cluster_id {
        super::cluster_service::get_cluster(db, &cluster_id).await?;
        model.cluster_id = Set(cluster_id);
    }
    Ok(model.update(db).await?)
}

/// Перенести узел в кластер. Узел всегда принадлежит ровно одному кластеру,
/// поэтому «отвязать» его можно только переносом в другой.
pub async fn move_to_cluster(
    db: &DatabaseConnection,
    cluster_id: &str,
    node_id: &str,
) -> Result<Model, AppError> {
    update_node(
        db,
        node_id,
        NodePatch {
            cluster_id: Some(cluster_id.to_string()),
            ..NodePatch::default()
        },
    )
    .await
}

pub async fn delete_node(db: &DatabaseConnection, node_id: &str) -> Result<(), AppError> {
    let record = get_node(db, node_id).await?;
    let model: ActiveModel = record.into();
    model.delete(db).await?;
    Ok(())
}

/// Найти узел агента и проверить его токен за постоянное время.
pub async fn authenticate_node(
    db: &DatabaseConnection,
    node_id: &str,
    token: &str,
) -> Result<Model, AppError> {
    let record = NodeEntity::find_by_id(node_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Узел не найден: {node_id}")))?;

    if !verify_node_token(&record.token, token) {
        return Err(AppError::Unauthorized("Неверный токен узла".into()));
    }
    Ok(record)
}

/// Принять heartbeat агента.
pub async fn heartbeat(
    db: &DatabaseConnection,
    token: &str,
    data: HeartbeatData,
) -> Result<(), AppError> {
    let record = authenticate_node(db, &data.node_id, token).await?;

    let mut model: ActiveModel = record.into();
    model.status = Set(data.status);
    if data.version.is_some() {
        model.version = Set(data.version);
    }
    model.last_heartbeat = Set(Some(timestamp_now()));
    model.update(db).await?;

    Ok(())
}

/// Состояние всех узлов: ONLINE и heartbeat моложе `HEARTBEAT_TTL_SECS`.
pub async fn node_health(db: &DatabaseConnection) -> Result<Vec<NodeHealth>, AppError> {
    let now = Utc::now();
    let nodes = list_nodes(db).await?;

    Ok(nodes
        .into_iter()
        .map(|node| {
            let healthy = node.status == NodeStatus::Online
                && node
                    .last_heartbeat
                    .as_deref()
                    .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
                    .is_some_and(|ts| {
                        now.signed_duration_since(ts.with_timezone(&Utc))
                            .num_seconds()
                            < HEARTBEAT_TTL_SECS
                    });
            NodeHealth { node, healthy }
        })
        .collect())
}

/// Перевести в OFFLINE узлы, которые давно не присылали heartbeat.
/// Возвращает число изменённых узлов.
pub async fn mark_stale_nodes(db: &DatabaseConnection) -> Result<usize, sea_orm::DbErr> {
    let now = Utc::now();
    let online = NodeEntity::find()
        .filter(Column::Status.eq(NodeStatus::Online))
        .all(db)
        .await?;

    let mut changed = 0;
    for node in online {
        let stale = match node
            .last_heartbeat
            .as_deref()
            .map(chrono::DateTime::parse_from_rfc3339)
        {
            Some(Ok(ts)) => {
                now.signed_duration_since(ts.with_timezone(&Utc))
                    .num_seconds()
                    > HEARTBEAT_TTL_SECS
            }
            // Нет heartbeat или мусор в поле: узел не подтверждал, что жив
            _ => true,
        };
        if !stale {
            continue;
        }

        tracing::info!("Узел {} ({}) переведён в OFFLINE", node.name, node.id);
        let mut model: ActiveModel = node.into();
        model.status = Set(NodeStatus::Offline);
        model.update(db).await?;
        changed += 1;
    }

    Ok(changed)
}

fn check_port(port: i32) -> Result<(), AppError> {
    if (1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Некорректный порт: {port}")))
    }
}

fn verify_node_token(expected: &str, provided: &str) -> bool {
    use subtle::ConstantTimeEq;
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
