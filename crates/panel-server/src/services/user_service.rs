//! Сервис пользователей: список, ручное создание, правка, удаление.

use crate::error::AppError;
use crate::store::timestamp_now;
use panel_entities::byte_count::ByteCount;
use panel_entities::enums::{UserRole, UserStatus};
use panel_entities::subscriptions;
use panel_entities::users::{ActiveModel, Column, Entity as UserEntity, Model};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    /// Без пароля создаётся пользователь-заглушка со случайным секретом
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<ByteCount>,
    pub expire_date: Option<String>,
}

#[derive(Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<ByteCount>,
    pub expire_date: Option<String>,
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<Model>, AppError> {
    Ok(UserEntity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_user(db: &DatabaseConnection, user_id: &str) -> Result<Model, AppError> {
    UserEntity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Пользователь не найден: {user_id}")))
}

pub async fn create_user(db: &DatabaseConnection, data: NewUser) -> Result<Model, AppError> {
    if data.email.is_empty() {
        return Err(AppError::BadRequest("email обязателен".into()));
    }
    ensure_email_free(db, &data.email, None).await?;
    if let Some(cluster_id) = &data.cluster_id {
        super::cluster_service::get_cluster(db, cluster_id).await?;
    }

    let now = timestamp_now();
    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(data.email),
        password: Set(data.password.unwrap_or_else(|| Uuid::new_v4().to_string())),
        name: Set(data.name),
        role: Set(data.role.unwrap_or(UserRole::User)),
        status: Set(data.status.unwrap_or(UserStatus::Active)),
        cluster_id: Set(data.cluster_id),
        traffic_limit: Set(data.traffic_limit),
        expire_date: Set(data.expire_date),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

pub async fn update_user(
    db: &DatabaseConnection,
    user_id: &str,
    patch: UserPatch,
) -> Result<Model, AppError> {
    let record = get_user(db, user_id).await?;
    let mut model: ActiveModel = record.into();

    if let Some(email) = patch.email.filter(|e| !e.is_empty()) {
        ensure_email_free(db, &email, Some(user_id)).await?;
        model.email = Set(email);
    }
    if let Some(name) = patch.name {
        model.name = Set(Some(name));
    }
    if let Some(password) = patch.password.filter(|p| !p.is_empty()) {
        model.password = Set(password);
    }
    if let Some(role) = patch.role {
        model.role = Set(role);
    }
    if let Some(status) = patch.status {
        model.status = Set(status);
    }
    if let Some(cluster_id) = patch.cluster_id {
        super::cluster_service::get_cluster(db, &cluster_id).await?;
        model.cluster_id = Set(Some(cluster_id));
    }
    if let Some(limit) = patch.traffic_limit {
        model.traffic_limit = Set(Some(limit));
    }
    if let Some(expire) = patch.expire_date {
        model.expire_date = Set(Some(expire));
    }
    model.updated_at = Set(timestamp_now());
    Ok(model.update(db).await?)
}

/// Удалить пользователя вместе с его подписками. Возвращает число удалённых подписок.
pub async fn delete_user(db: &DatabaseConnection, user_id: &str) -> Result<u64, AppError> {
    get_user(db, user_id).await?;

    let txn = db.begin().await?;
    let removed = subscriptions::Entity::delete_many()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;
    UserEntity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    Ok(removed)
}

async fn ensure_email_free(
    db: &DatabaseConnection,
    email: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    let existing = UserEntity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await?;
    match existing {
        Some(u) if Some(u.id.as_str()) != except_id => Err(AppError::Conflict(format!(
            "Пользователь {email} уже существует"
        ))),
        _ => Ok(()),
    }
}
