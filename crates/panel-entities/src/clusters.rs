//! Entity для таблицы clusters.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clusters")]
pub struct Model {
    /// UUID первичного ключа
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Уникальное имя кластера
    #[sea_orm(unique)]
    pub name: String,

    /// Тип распределения (например LOAD_BALANCE)
    pub cluster_type: String,

    pub description: Option<String>,

    /// Время создания (ISO-8601, UTC, микросекунды)
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
