//! Entity для таблицы users.

use crate::byte_count::ByteCount;
use crate::enums::{UserRole, UserStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Естественный ключ импорта (регистрозависимый)
    #[sea_orm(unique)]
    pub email: String,

    /// Непрозрачный секрет, панель его не интерпретирует
    #[serde(skip_serializing)]
    pub password: String,

    pub name: Option<String>,

    pub role: UserRole,

    pub status: UserStatus,

    pub cluster_id: Option<String>,

    /// Лимит трафика в байтах
    #[sea_orm(column_type = "Text", nullable)]
    pub traffic_limit: Option<ByteCount>,

    pub expire_date: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
