//! Entity для таблицы nodes.

use crate::enums::NodeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    pub hostname: String,

    /// Адрес, который получают клиенты подписки
    pub ip_address: String,

    /// Порт shadowsocks; NULL означает порт по умолчанию
    pub port: Option<i32>,

    /// Порт API агента
    pub api_port: i32,

    /// Токен агента для heartbeat
    pub token: String,

    pub status: NodeStatus,

    /// Версия агента из последнего heartbeat
    pub version: Option<String>,

    pub country: Option<String>,

    pub city: Option<String>,

    /// Кластер-владелец
    pub cluster_id: String,

    /// Время последнего heartbeat (ISO-8601)
    pub last_heartbeat: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
