//! Административные маршруты: кластеры, узлы, пользователи, подписки, трафик,
//! импорт.

use crate::api::middleware::AdminUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::admin_service;
use crate::services::cluster_service::{self, ClusterData, ClusterPatch};
use crate::services::import_service::{self, ImportPayload, ImportResult};
use crate::services::node_service::{self, NewNode, NodePatch};
use crate::services::singbox_config::{self, SingboxConfig};
use crate::services::subscription_config::{self, ConfigDocument};
use crate::services::subscription_service::{self, NewSubscription, SubscriptionPatch};
use crate::services::traffic_service::{self, NewTrafficRecord, TrafficFilter};
use crate::services::user_service::{self, NewUser, UserPatch};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use panel_entities::byte_count::ByteCount;
use panel_entities::enums::{NodeStatus, SubscriptionStatus, UserRole, UserStatus};
use panel_entities::{clusters, nodes, subscriptions, traffic_records, users};
use serde::{Deserialize, Serialize};

// ── Типы запросов/ответов ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRow {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    pub description: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u64>,
}

impl From<clusters::Model> for ClusterRow {
    fn from(c: clusters::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            cluster_type: c.cluster_type,
            description: c.description,
            created_at: c.created_at,
            node_count: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub cluster_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    pub port: Option<i32>,
    pub api_port: i32,
    pub token: String,
    pub status: NodeStatus,
    pub version: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cluster_id: String,
    pub last_heartbeat: Option<String>,
    pub created_at: String,
}

impl From<nodes::Model> for NodeRow {
    fn from(n: nodes::Model) -> Self {
        Self {
            id: n.id,
            name: n.name,
            hostname: n.hostname,
            ip_address: n.ip_address,
            port: n.port,
            api_port: n.api_port,
            token: n.token,
            status: n.status,
            version: n.version,
            country: n.country,
            city: n.city,
            cluster_id: n.cluster_id,
            last_heartbeat: n.last_heartbeat,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub name: String,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    /// Старое имя поля у ранних клиентов
    pub ip: Option<String>,
    pub port: Option<i32>,
    pub api_port: Option<i32>,
    pub token: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cluster_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<i32>,
    pub api_port: Option<i32>,
    pub status: Option<NodeStatus>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub cluster_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachNodeRequest {
    pub node_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHealthRow {
    pub id: String,
    pub name: String,
    pub status: NodeStatus,
    pub last_heartbeat: Option<String>,
    pub version: Option<String>,
    pub is_healthy: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<ByteCount>,
    pub expire_date: Option<String>,
    pub created_at: String,
}

impl From<users::Model> for UserRow {
    fn from(u: users::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            status: u.status,
            cluster_id: u.cluster_id,
            traffic_limit: u.traffic_limit,
            expire_date: u.expire_date,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<u64>,
    pub expire_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<u64>,
    pub expire_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUserResponse {
    pub deleted_subscriptions: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRow {
    pub id: String,
    pub public_id: String,
    pub name: String,
    pub user_id: String,
    pub cluster_id: String,
    pub status: SubscriptionStatus,
    pub max_connections: i32,
    pub bandwidth_limit: Option<ByteCount>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl From<subscriptions::Model> for SubscriptionRow {
    fn from(s: subscriptions::Model) -> Self {
        Self {
            id: s.id,
            public_id: s.public_id,
            name: s.name,
            user_id: s.user_id,
            cluster_id: s.cluster_id,
            status: s.status,
            max_connections: s.max_connections,
            bandwidth_limit: s.bandwidth_limit,
            expires_at: s.expires_at,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: String,
    pub cluster_id: String,
    pub name: String,
    pub status: Option<SubscriptionStatus>,
    pub max_connections: Option<u32>,
    pub bandwidth_limit: Option<u64>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub name: Option<String>,
    pub cluster_id: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub max_connections: Option<u32>,
    pub bandwidth_limit: Option<u64>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRow {
    pub id: String,
    pub node_id: String,
    pub user_id: Option<String>,
    pub upload: i64,
    pub download: i64,
    pub timestamp: String,
}

impl From<traffic_records::Model> for TrafficRow {
    fn from(t: traffic_records::Model) -> Self {
        Self {
            id: t.id,
            node_id: t.node_id,
            user_id: t.user_id,
            upload: t.upload,
            download: t.download,
            timestamp: t.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrafficRequest {
    pub node_id: String,
    pub user_id: Option<String>,
    pub upload: u64,
    pub download: u64,
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficQuery {
    pub node_id: Option<String>,
    pub user_id: Option<String>,
}

impl From<TrafficQuery> for TrafficFilter {
    fn from(q: TrafficQuery) -> Self {
        Self {
            node_id: q.node_id.filter(|id| !id.is_empty()),
            user_id: q.user_id.filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStatsResponse {
    pub records: u64,
    pub total_upload: u64,
    pub total_download: u64,
    pub avg_upload: f64,
    pub avg_download: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_nodes: u64,
    pub total_clusters: u64,
    pub online_nodes: u64,
    pub offline_nodes: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clusters", get(list_clusters).post(create_cluster))
        .route(
            "/clusters/{id}",
            get(get_cluster).patch(update_cluster).delete(delete_cluster),
        )
        .route("/clusters/{id}/nodes", post(attach_node))
        .route("/nodes", get(list_nodes).post(create_node))
        .route("/nodes/health", get(node_health))
        .route(
            "/nodes/{id}",
            get(get_node).patch(update_node).delete(delete_node),
        )
        .route("/nodes/{id}/singbox", get(get_node_singbox))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/subscriptions", get(list_user_subscriptions))
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/subscriptions/{id}",
            get(get_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
        .route("/subscriptions/{id}/config", get(get_subscription_config))
        .route("/traffic", get(list_traffic).post(create_traffic))
        .route("/traffic/stats", get(get_traffic_stats))
        .route("/traffic/{id}", get(get_traffic_record))
        .route("/import", post(import))
        .route("/stats", get(get_stats))
}

// ── Кластеры ─────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/clusters
async fn list_clusters(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<ClusterRow>>, AppError> {
    let clusters = cluster_service::list_clusters(&state.db).await?;
    let rows = clusters
        .into_iter()
        .map(|s| ClusterRow {
            node_count: Some(s.node_count),
            ..ClusterRow::from(s.cluster)
        })
        .collect();
    Ok(Json(rows))
}

/// POST /api/v1/admin/clusters
async fn create_cluster(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateClusterRequest>,
) -> Result<(StatusCode, Json<ClusterRow>), AppError> {
    let cluster = cluster_service::create_cluster(
        &state.db,
        ClusterData {
            name: req.name,
            cluster_type: req.cluster_type,
            description: req.description,
        },
    )
    .await?;
    tracing::info!("Создан кластер {} ({})", cluster.name, cluster.id);
    Ok((StatusCode::CREATED, Json(cluster.into())))
}

/// GET /api/v1/admin/clusters/{id}
async fn get_cluster(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ClusterRow>, AppError> {
    let cluster = cluster_service::get_cluster(&state.db, &id).await?;
    Ok(Json(cluster.into()))
}

/// PATCH /api/v1/admin/clusters/{id}
async fn update_cluster(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateClusterRequest>,
) -> Result<Json<ClusterRow>, AppError> {
    let cluster = cluster_service::update_cluster(
        &state.db,
        &id,
        ClusterPatch {
            name: req.name,
            cluster_type: req.cluster_type,
            description: req.description,
        },
    )
    .await?;
    Ok(Json(cluster.into()))
}

/// DELETE /api/v1/admin/clusters/{id} — только пустой кластер.
async fn delete_cluster(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    cluster_service::delete_cluster(&state.db, &id).await?;
    tracing::info!("Удалён кластер {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/clusters/{id}/nodes — перенести узел в кластер.
async fn attach_node(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<AttachNodeRequest>,
) -> Result<Json<NodeRow>, AppError> {
    let node = node_service::move_to_cluster(&state.db, &id, &req.node_id).await?;
    tracing::info!("Узел {} перенесён в кластер {id}", node.id);
    Ok(Json(node.into()))
}

// ── Узлы ─────────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/nodes
async fn list_nodes(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<NodeRow>>, AppError> {
    let nodes = node_service::list_nodes(&state.db).await?;
    Ok(Json(nodes.into_iter().map(NodeRow::from).collect()))
}

/// POST /api/v1/admin/nodes
async fn create_node(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<NodeRow>), AppError> {
    let ip_address = req
        .ip_address
        .or(req.ip)
        .ok_or_else(|| AppError::BadRequest("ipAddress обязателен".into()))?;

    let node = node_service::create_node(
        &state.db,
        NewNode {
            name: req.name,
            hostname: req.hostname,
            ip_address,
            port: req.port,
            api_port: req.api_port,
            token: req.token,
            country: req.country,
            city: req.city,
            cluster_id: req.cluster_id,
        },
    )
    .await?;
    tracing::info!("Добавлен узел {} ({}) в кластер {}", node.name, node.id, node.cluster_id);
    Ok((StatusCode::CREATED, Json(node.into())))
}

/// GET /api/v1/admin/nodes/health — живость узлов по heartbeat.
async fn node_health(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<NodeHealthRow>>, AppError> {
    let health = node_service::node_health(&state.db).await?;
    let rows = health
        .into_iter()
        .map(|h| NodeHealthRow {
            id: h.node.id,
            name: h.node.name,
            status: h.node.status,
            last_heartbeat: h.node.last_heartbeat,
            version: h.node.version,
            is_healthy: h.healthy,
        })
        .collect();
    Ok(Json(rows))
}

/// GET /api/v1/admin/nodes/{id}
async fn get_node(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<NodeRow>, AppError> {
    let node = node_service::get_node(&state.db, &id).await?;
    Ok(Json(node.into()))
}

/// PATCH /api/v1/admin/nodes/{id}
async fn update_node(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateNodeRequest>,
) -> Result<Json<NodeRow>, AppError> {
    let node = node_service::update_node(
        &state.db,
        &id,
        NodePatch {
            name: req.name,
            hostname: req.hostname,
            ip_address: req.ip_address,
            port: req.port,
            api_port: req.api_port,
            status: req.status,
            country: req.country,
            city: req.city,
            cluster_id: req.cluster_id,
        },
    )
    .await?;
    Ok(Json(node.into()))
}

/// GET /api/v1/admin/nodes/{id}/singbox — серверный конфиг узла.
async fn get_node_singbox(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<SingboxConfig>, AppError> {
    Ok(Json(singbox_config::server_config(&state.db, &id).await?))
}

/// DELETE /api/v1/admin/nodes/{id}
async fn delete_node(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    node_service::delete_node(&state.db, &id).await?;
    tracing::info!("Удалён узел {id}");
    Ok(StatusCode::NO_CONTENT)
}

// ── Пользователи ─────────────────────────────────────────────────────────────

/// GET /api/v1/admin/users
async fn list_users(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<UserRow>>, AppError> {
    let users = user_service::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserRow::from).collect()))
}

/// POST /api/v1/admin/users
async fn create_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let user = user_service::create_user(
        &state.db,
        NewUser {
            email: req.email,
            name: req.name,
            password: req.password,
            role: req.role,
            status: req.status,
            cluster_id: req.cluster_id,
            traffic_limit: req.traffic_limit.map(ByteCount),
            expire_date: req.expire_date,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/v1/admin/users/{id}
async fn get_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<UserRow>, AppError> {
    Ok(Json(user_service::get_user(&state.db, &id).await?.into()))
}

/// PATCH /api/v1/admin/users/{id}
async fn update_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserRow>, AppError> {
    let user = user_service::update_user(
        &state.db,
        &id,
        UserPatch {
            email: req.email,
            name: req.name,
            password: req.password,
            role: req.role,
            status: req.status,
            cluster_id: req.cluster_id,
            traffic_limit: req.traffic_limit.map(ByteCount),
            expire_date: req.expire_date,
        },
    )
    .await?;
    Ok(Json(user.into()))
}

/// DELETE /api/v1/admin/users/{id} — вместе с подписками пользователя.
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedUserResponse>, AppError> {
    let deleted_subscriptions = user_service::delete_user(&state.db, &id).await?;
    tracing::info!("Удалён пользователь {id}, подписок: {deleted_subscriptions}");
    Ok(Json(DeletedUserResponse {
        deleted_subscriptions,
    }))
}

/// GET /api/v1/admin/users/{id}/subscriptions
async fn list_user_subscriptions(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<SubscriptionRow>>, AppError> {
    let subs = subscription_service::list_user_subscriptions(&state.db, &id).await?;
    Ok(Json(subs.into_iter().map(SubscriptionRow::from).collect()))
}

// ── Подписки ─────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/subscriptions
async fn list_subscriptions(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<SubscriptionRow>>, AppError> {
    let subs = subscription_service::list_subscriptions(&state.db).await?;
    Ok(Json(subs.into_iter().map(SubscriptionRow::from).collect()))
}

/// POST /api/v1/admin/subscriptions
async fn create_subscription(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionRow>), AppError> {
    let max_connections = req.max_connections.map(to_max_connections).transpose()?;

    let sub = subscription_service::create_subscription(
        &state.db,
        NewSubscription {
            user_id: req.user_id,
            cluster_id: req.cluster_id,
            name: req.name,
            status: req.status,
            max_connections,
            bandwidth_limit: req.bandwidth_limit.map(ByteCount),
            expires_at: req.expires_at,
        },
    )
    .await?;
    tracing::info!("Создана подписка {} для пользователя {}", sub.id, sub.user_id);
    Ok((StatusCode::CREATED, Json(sub.into())))
}

/// GET /api/v1/admin/subscriptions/{id}
async fn get_subscription(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionRow>, AppError> {
    let sub = subscription_service::get_subscription(&state.db, &id).await?;
    Ok(Json(sub.into()))
}

/// PATCH /api/v1/admin/subscriptions/{id}
async fn update_subscription(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> Result<Json<SubscriptionRow>, AppError> {
    let sub = subscription_service::update_subscription(
        &state.db,
        &id,
        SubscriptionPatch {
            name: req.name,
            cluster_id: req.cluster_id,
            status: req.status,
            max_connections: req.max_connections.map(to_max_connections).transpose()?,
            bandwidth_limit: req.bandwidth_limit.map(ByteCount),
            expires_at: req.expires_at,
        },
    )
    .await?;
    Ok(Json(sub.into()))
}

/// DELETE /api/v1/admin/subscriptions/{id}
async fn delete_subscription(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    subscription_service::delete_subscription(&state.db, &id).await?;
    tracing::info!("Удалена подписка {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/subscriptions/{id}/config — конфиг по внутреннему id.
async fn get_subscription_config(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ConfigDocument>, AppError> {
    let document = subscription_config::resolve_config(&state.store, &id).await?;
    Ok(Json(document))
}

// ── Трафик ───────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/traffic?nodeId=&userId= — последние замеры.
async fn list_traffic(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<TrafficQuery>,
) -> Result<Json<Vec<TrafficRow>>, AppError> {
    let filter: TrafficFilter = query.into();
    let records = traffic_service::list_traffic(&state.db, &filter).await?;
    Ok(Json(records.into_iter().map(TrafficRow::from).collect()))
}

/// POST /api/v1/admin/traffic
async fn create_traffic(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateTrafficRequest>,
) -> Result<(StatusCode, Json<TrafficRow>), AppError> {
    let record = traffic_service::record_traffic(
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
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/v1/admin/traffic/stats?nodeId=&userId= — сумма и среднее.
async fn get_traffic_stats(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<TrafficQuery>,
) -> Result<Json<TrafficStatsResponse>, AppError> {
    let filter: TrafficFilter = query.into();
    let stats = traffic_service::traffic_stats(&state.db, &filter).await?;
    Ok(Json(TrafficStatsResponse {
        records: stats.records,
        total_upload: stats.total_upload,
        total_download: stats.total_download,
        avg_upload: stats.avg_upload,
        avg_download: stats.avg_download,
    }))
}

/// GET /api/v1/admin/traffic/{id}
async fn get_traffic_record(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<TrafficRow>, AppError> {
    Ok(Json(traffic_service::get_record(&state.db, &id).await?.into()))
}

// ── Импорт и статистика ──────────────────────────────────────────────────────

/// POST /api/v1/admin/import — слияние выгрузки внешней системы.
async fn import(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Json(payload): Json<ImportPayload>,
) -> Json<ImportResult> {
    tracing::info!(
        "Импорт от {}: {} пользователей, {} подписок",
        claims.sub,
        payload.users.len(),
        payload.subscriptions.len()
    );
    Json(import_service::import_batch(&state.store, payload).await)
}

/// GET /api/v1/admin/stats
async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = admin_service::get_stats(&state.db).await?;

    Ok(Json(StatsResponse {
        total_users: stats.total_users,
        total_nodes: stats.total_nodes,
        total_clusters: stats.total_clusters,
        online_nodes: stats.online_nodes,
        offline_nodes: stats.offline_nodes,
    }))
}

fn to_max_connections(value: u32) -> Result<i32, AppError> {
    i32::try_from(value)
        .map_err(|_| AppError::BadRequest(format!("maxConnections вне диапазона: {value}")))
}
