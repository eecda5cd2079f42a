//! Фоновая задача: перевод молчащих узлов в OFFLINE.

use super::node_service;
use sea_orm::DatabaseConnection;

/// Запустить бесконечный цикл проверки (каждую минуту).
pub async fn run_cleanup_loop(db: DatabaseConnection) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
    interval.tick().await;
    loop {
        interval.tick().await;

        match node_service::mark_stale_nodes(&db).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Помечено OFFLINE узлов: {n}"),
            Err(e) => tracing::error!("Ошибка проверки heartbeat узлов: {e}"),
        }
    }
}
