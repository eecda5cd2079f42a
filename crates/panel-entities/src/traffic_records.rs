//! Entity для таблицы traffic_records: замеры трафика узлов.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "traffic_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub node_id: String,

    /// Пользователь, если замер персональный
    pub user_id: Option<String>,

    /// Отдано, байт
    pub upload: i64,

    /// Получено, байт
    pub download: i64,

    /// Момент замера (ISO-8601)
    pub timestamp: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
