//! Порт хранилища: всё, что ядро подписок и импорта читает и пишет в БД.
//!
//! Сервисы получают реализацию явно (через `AppState`), глобального клиента нет.

mod sea;

pub use sea::SeaOrmStore;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use panel_entities::byte_count::ByteCount;
use panel_entities::enums::{SubscriptionStatus, UserRole, UserStatus};
use panel_entities::{clusters, nodes, subscriptions, users};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ошибка БД: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("нарушена целостность данных: {0}")]
    Integrity(String),
}

/// Какая ветка upsert была выполнена.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Подписка вместе с кластером и его узлами.
#[derive(Debug, Clone)]
pub struct SubscriptionBundle {
    pub subscription: subscriptions::Model,
    pub cluster: clusters::Model,
    /// Узлы кластера в порядке создания
    pub nodes: Vec<nodes::Model>,
}

#[derive(Debug, Clone)]
pub struct NewCluster {
    pub name: String,
    pub cluster_type: String,
    pub description: Option<String>,
}

/// Данные upsert пользователя по email.
///
/// `password` используется только при создании. Поля `None` при обновлении
/// не трогаются.
#[derive(Debug, Clone)]
pub struct UserUpsert {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<ByteCount>,
    pub expire_date: Option<String>,
}

/// Данные upsert подписки по public_id.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub public_id: String,
    pub user_id: String,
    /// Явно указанный кластер; при обновлении меняется только он
    pub cluster_id: Option<String>,
    /// Кластер для новой записи, если явного нет
    pub fallback_cluster_id: String,
    pub name: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub max_connections: Option<i32>,
    pub bandwidth_limit: Option<ByteCount>,
    pub expires_at: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_cluster_by_id(&self, id: &str) -> Result<Option<clusters::Model>, StoreError>;

    async fn find_first_cluster_by_creation(&self)
        -> Result<Option<clusters::Model>, StoreError>;

    async fn create_cluster(&self, data: NewCluster) -> Result<clusters::Model, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<users::Model>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, StoreError>;

    async fn upsert_user_by_email(
        &self,
        data: UserUpsert,
    ) -> Result<(users::Model, UpsertOutcome), StoreError>;

    async fn find_subscription_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SubscriptionBundle>, StoreError>;

    async fn find_subscription_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Option<SubscriptionBundle>, StoreError>;

    async fn upsert_subscription_by_public_id(
        &self,
        data: SubscriptionUpsert,
    ) -> Result<(subscriptions::Model, UpsertOutcome), StoreError>;
}

/// Текущее время в ISO-8601 с фиксированной точностью, чтобы строки
/// сортировались так же, как моменты времени.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
