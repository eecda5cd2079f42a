//! Entity для таблицы subscriptions.

use crate::byte_count::ByteCount;
use crate::enums::SubscriptionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Публичный токен подписки, попадает в ссылку /sub/{public_id}
    #[sea_orm(unique)]
    pub public_id: String,

    pub name: String,

    pub user_id: String,

    pub cluster_id: String,

    pub status: SubscriptionStatus,

    pub max_connections: i32,

    /// Лимит полосы в байтах
    #[sea_orm(column_type = "Text", nullable)]
    pub bandwidth_limit: Option<ByteCount>,

    pub expires_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
