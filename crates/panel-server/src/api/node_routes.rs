//! Маршруты агента узла: heartbeat, отчёт о трафике, конфиг sing-box.

use crate::api::middleware::NodeToken;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::node_service::{self, HeartbeatData};
use crate::services::singbox_config::{self, SingboxConfig};
use crate::services::traffic_service::{self, NewTrafficRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use panel_entities::enums::NodeStatus;
use serde::Deserialize;

/// Тело heartbeat в формате агента (snake_case).
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub node_id: String,
    pub status: NodeStatus,
    /// Unix-время отправки на стороне агента
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub version: Option<String>,
}

/// Замер трафика от агента.
#[derive(Debug, Deserialize)]
pub struct TrafficReport {
    pub node_id: String,
    pub user_id: Option<String>,
    pub upload: u64,
    pub download: u64,
    pub timestamp: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nodes/heartbeat", post(do_heartbeat))
        .route("/nodes/traffic", post(report_traffic))
        .route("/nodes/{node_id}/config", get(node_config))
}

/// POST /api/v1/nodes/heartbeat — агент сообщает статус узла.
async fn do_heartbeat(
    State(state): State<AppState>,
    NodeToken(token): NodeToken,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let node_id = req.node_id.clone();
    node_service::heartbeat(
        &state.db,
        &token,
        HeartbeatData {
            node_id: req.node_id,
            status: req.status,
            version: req.version,
        },
    )
    .await?;
    tracing::debug!(
        "Heartbeat: {node_id} ({:?}, ts агента {:?})",
        req.status,
        req.timestamp
    );

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// POST /api/v1/nodes/traffic — замер трафика узла.
async fn report_traffic(
    State(state): State<AppState>,
    NodeToken(token): NodeToken,
    Json(req): Json<TrafficReport>,
) -> Result<StatusCode, AppError> {
    node_service::authenticate_node(&state.db, &req.node_id, &token).await?;
    traffic_service::record_traffic(
        &state.db,
        NewTrafficRecord {
            node_id: req.node_id,
            user_id: req.user_id,
            upload: req.upload,
            download: req.download,
            timestamp: req.timestamp,
        },
    )
    .await?;
    Ok(StatusCode::CREATED)
}

/// GET /api/v1/nodes/{node_id}/config — конфиг sing-box для агента.
async fn node_config(
    State(state): State<AppState>,
    NodeToken(token): NodeToken,
    Path(node_id): Path<String>,
) -> Result<Json<SingboxConfig>, AppError> {
    let node = node_service::authenticate_node(&state.db, &node_id, &token).await?;
    let config = singbox_config::server_config_for(&state.db, &node).await?;
    tracing::debug!("Конфиг sing-box выдан узлу {node_id}");
    Ok(Json(config))
}
