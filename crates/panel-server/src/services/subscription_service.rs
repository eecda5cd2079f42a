//! Сервис подписок: список, создание, просмотр, правка, удаление.

use crate::error::AppError;
use crate::store::timestamp_now;
use panel_entities::byte_count::ByteCount;
use panel_entities::enums::SubscriptionStatus;
use panel_entities::subscriptions::{ActiveModel, Column, Entity as SubscriptionEntity, Model};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

pub struct NewSubscription {
    pub user_id: String,
    pub cluster_id: String,
    pub name: String,
    pub status: Option<SubscriptionStatus>,
    pub max_connections: Option<i32>,
    pub bandwidth_limit: Option<ByteCount>,
    pub expires_at: Option<String>,
}

/// Изменяемые поля подписки. `public_id` не меняется: он уже роздан клиентам.
#[derive(Default)]
pub struct SubscriptionPatch {
    pub name: Option<String>,
    pub cluster_id: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub max_connections: Option<i32>,
    pub bandwidth_limit: Option<ByteCount>,
    pub expires_at: Option<String>,
}

pub async fn list_subscriptions(db: &DatabaseConnection) -> Result<Vec<Model>, AppError> {
    Ok(SubscriptionEntity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Подписки одного пользователя.
pub async fn list_user_subscriptions(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<Model>, AppError> {
    super::user_service::get_user(db, user_id).await?;
    Ok(SubscriptionEntity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_subscription(db: &DatabaseConnection, id: &str) -> Result<Model, AppError> {
    SubscriptionEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Подписка не найдена: {id}")))
}

/// Создать подписку. `public_id` генерируется случайно и не связан с `id`.
pub async fn create_subscription(
    db: &DatabaseConnection,
    data: NewSubscription,
) -> Result<Model, AppError> {
    super::user_service::get_user(db, &data.user_id).await?;
    super::cluster_service::get_cluster(db, &data.cluster_id).await?;
    if let Some(max) = data.max_connections {
        check_max_connections(max)?;
    }

    let now = timestamp_now();
    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        public_id: Set(Uuid::new_v4().to_string()),
        name: Set(data.name),
        user_id: Set(data.user_id),
        cluster_id: Set(data.cluster_id),
        status: Set(data.status.unwrap_or(SubscriptionStatus::Active)),
        max_connections: Set(data.max_connections.unwrap_or(1)),
        bandwidth_limit: Set(data.bandwidth_limit),
        expires_at: Set(data.expires_at),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn update_subscription(
    db: &DatabaseConnection,
    id: &str,
    patch: SubscriptionPatch,
) -> Result<Model, AppError> {
    let record = get_subscription(db, id).await?;
    let mut model: ActiveModel = record.into();

    if let Some(name) = patch.name.filter(|n| !n.is_empty()) {
        model.name = Set(name);
    }
    if let Some(cluster_id) = patch.cluster_id {
        super::cluster_service::get_cluster(db, &cluster_id).await?;
        model.cluster_id = Set(cluster_id);
    }
    if let Some(status) = patch.status {
        model.status = Set(status);
    }
    if let Some(max) = patch.max_connections {
        check_max_connections(max)?;
        model.max_connections = Set(max);
    }
    if let Some(limit) = patch.bandwidth_limit {
        model.bandwidth_limit = Set(Some(limit));
    }
    if let Some(expires) = patch.expires_at {
        model.expires_at = Set(Some(expires));
    }
    model.updated_at = Set(timestamp_now());
    Ok(model.update(db).await?)
}

pub async fn delete_subscription(db: &DatabaseConnection, id: &str) -> Result<(), AppError> {
    let record = get_subscription(db, id).await?;
    let model: ActiveModel = record.into();
    model.delete(db).await?;
    Ok(())
}

fn check_max_connections(max: i32) -> Result<(), AppError> {
    if max >= 1 {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "maxConnections должен быть не меньше 1: {max}"
        )))
    }
}
