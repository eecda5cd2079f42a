//! Учёт трафика: замеры от узлов и агрегаты по узлу или пользователю.

use crate::error::AppError;
use crate::store::timestamp_now;
use chrono::{DateTime, SecondsFormat, Utc};
use panel_entities::traffic_records::{ActiveModel, Column, Entity as TrafficEntity, Model};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

/// Сколько последних замеров отдаёт список.
pub const TRAFFIC_PAGE_SIZE: u64 = 100;

pub struct NewTrafficRecord {
    pub node_id: String,
    pub user_id: Option<String>,
    pub upload: u64,
    pub download: u64,
    /// RFC 3339; без значения берётся текущее время
    pub timestamp: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct TrafficFilter {
    pub node_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrafficStats {
    pub records: u64,
    pub total_upload: u64,
    pub total_download: u64,
    pub avg_upload: f64,
    pub avg_download: f64,
}

pub async fn record_traffic(
    db: &DatabaseConnection,
    data: NewTrafficRecord,
) -> Result<Model, AppError> {
    super::node_service::get_node(db, &data.node_id).await?;
    if let Some(user_id) = &data.user_id {
        super::user_service::get_user(db, user_id).await?;
    }

    let timestamp = match data.timestamp {
        Some(ts) => DateTime::parse_from_rfc3339(&ts)
            .map(|d| {
                d.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Micros, true)
            })
            .map_err(|_| AppError::BadRequest(format!("Некорректная дата замера: {ts}")))?,
        None => timestamp_now(),
    };

    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        node_id: Set(data.node_id),
        user_id: Set(data.user_id),
        upload: Set(to_column(data.upload, "upload")?),
        download: Set(to_column(data.download, "download")?),
        timestamp: Set(timestamp),
    };
    Ok(model.insert(db).await?)
}

/// Последние замеры, новые первыми.
pub async fn list_traffic(
    db: &DatabaseConnection,
    filter: &TrafficFilter,
) -> Result<Vec<Model>, AppError> {
    Ok(filtered(filter)
        .order_by_desc(Column::Timestamp)
        .limit(TRAFFIC_PAGE_SIZE)
        .all(db)
        .await?)
}

pub async fn get_record(db: &DatabaseConnection, id: &str) -> Result<Model, AppError> {
    TrafficEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Замер не найден: {id}")))
}

/// Сумма и среднее по замерам, попавшим под фильтр. Пустая выборка даёт нули.
pub async fn traffic_stats(
    db: &DatabaseConnection,
    filter: &TrafficFilter,
) -> Result<TrafficStats, AppError> {
    let rows: Vec<(i64, i64)> = filtered(filter)
        .select_only()
        .column(Column::Upload)
        .column(Column::Download)
        .into_tuple()
        .all(db)
        .await?;

    let mut stats = TrafficStats::default();
    for (upload, download) in rows {
        stats.records += 1;
        stats.total_upload = stats.total_upload.saturating_add(upload.max(0) as u64);
        stats.total_download = stats.total_download.saturating_add(download.max(0) as u64);
    }
    if stats.records > 0 {
        stats.avg_upload = stats.total_upload as f64 / stats.records as f64;
        stats.avg_download = stats.total_download as f64 / stats.records as f64;
    }
    Ok(stats)
}

fn filtered(filter: &TrafficFilter) -> Select<TrafficEntity> {
    let mut query = TrafficEntity::find();
    if let Some(node_id) = filter.node_id.as_deref() {
        query = query.filter(Column::NodeId.eq(node_id));
    }
    if let Some(user_id) = filter.user_id.as_deref() {
        query = query.filter(Column::UserId.eq(user_id));
    }
    query
}

fn to_column(value: u64, field: &str) -> Result<i64, AppError> {
    i64::try_from(value).map_err(|_| AppError::BadRequest(format!("{field} вне диапазона: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cluster_service::{self, ClusterData};
    use crate::services::node_service::{self, NewNode};
    use panel_migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn db_with_node() -> (DatabaseConnection, String) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let cluster = cluster_service::create_cluster(
            &db,
            ClusterData {
                name: "T".to_string(),
                cluster_type: None,
                description: None,
            },
        )
        .await
        .unwrap();
        let node = node_service::create_node(
            &db,
            NewNode {
                name: "N".to_string(),
                hostname: None,
                ip_address: "10.0.0.1".to_string(),
                port: None,
                api_port: None,
                token: None,
                country: None,
                city: None,
                cluster_id: cluster.id,
            },
        )
        .await
        .unwrap();
        (db, node.id)
    }

    fn sample(node_id: &str, upload: u64, download: u64, ts: &str) -> NewTrafficRecord {
        NewTrafficRecord {
            node_id: node_id.to_string(),
            user_id: None,
            upload,
            download,
            timestamp: Some(ts.to_string()),
        }
    }

    #[tokio::test]
    async fn test_stats_sum_and_average() {
        let (db, node_id) = db_with_node().await;
        record_traffic(&db, sample(&node_id, 100, 500, "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        record_traffic(&db, sample(&node_id, 200, 300, "2026-01-01T01:00:00Z"))
            .await
            .unwrap();

        let filter = TrafficFilter {
            node_id: Some(node_id.clone()),
            user_id: None,
        };
        let stats = traffic_stats(&db, &filter).await.unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.total_upload, 300);
        assert_eq!(stats.total_download, 800);
        assert_eq!(stats.avg_upload, 150.0);
        assert_eq!(stats.avg_download, 400.0);

        let listed = list_traffic(&db, &filter).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].upload, 200, "новые замеры первыми");
    }

    #[tokio::test]
    async fn test_empty_selection_gives_zero_stats() {
        let (db, _node_id) = db_with_node().await;
        let filter = TrafficFilter {
            node_id: Some("other".to_string()),
            user_id: None,
        };
        assert_eq!(
            traffic_stats(&db, &filter).await.unwrap(),
            TrafficStats::default()
        );
    }

    #[tokio::test]
    async fn test_unknown_node_and_bad_timestamp_rejected() {
        let (db, node_id) = db_with_node().await;
        let err = record_traffic(&db, sample("missing", 1, 1, "2026-01-01T00:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = record_traffic(&db, sample(&node_id, 1, 1, "вчера"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
