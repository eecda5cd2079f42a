//! Серверная конфигурация sing-box для узла.
//!
//! Пароли пользователей выводятся той же `derive_password`, что и у клиента
//! подписки, поэтому узел и клиент сходятся без общего хранимого секрета.

use crate::error::AppError;
use crate::services::subscription_config::{
    derive_password, effective_port, node_key, CIPHER_METHOD, TRANSPORT_TYPE,
};
use panel_entities::enums::SubscriptionStatus;
use panel_entities::{nodes, subscriptions};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

const INBOUND_TAG: &str = "ss-in";
const DIRECT_TAG: &str = "direct";
const BLOCK_TAG: &str = "block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingboxConfig {
    pub log: LogSection,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSection {
    pub level: String,
    pub timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub inbound_type: String,
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    pub method: String,
    pub users: Vec<InboundUser>,
}

/// Пользователь inbound: одна активная подписка кластера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundUser {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outbound {
    #[serde(rename = "type")]
    pub outbound_type: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub rules: Vec<RouteRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRule {
    pub inbound: Vec<String>,
    pub outbound: String,
}

/// Собрать конфиг узла по подпискам его кластера. Учитываются только ACTIVE.
pub fn to_server_config(node: &nodes::Model, subs: &[subscriptions::Model]) -> SingboxConfig {
    let users = subs
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active)
        .map(|s| InboundUser {
            name: s.public_id.clone(),
            password: derive_password(&s.public_id, node_key(node)),
        })
        .collect();

    SingboxConfig {
        log: LogSection {
            level: "info".to_string(),
            timestamp: true,
        },
        inbounds: vec![Inbound {
            inbound_type: TRANSPORT_TYPE.to_string(),
            tag: INBOUND_TAG.to_string(),
            listen: "0.0.0.0".to_string(),
            listen_port: effective_port(node.port),
            method: CIPHER_METHOD.to_string(),
            users,
        }],
        outbounds: vec![
            Outbound {
                outbound_type: "direct".to_string(),
                tag: DIRECT_TAG.to_string(),
            },
            Outbound {
                outbound_type: "block".to_string(),
                tag: BLOCK_TAG.to_string(),
            },
        ],
        route: Route {
            rules: vec![RouteRule {
                inbound: vec![INBOUND_TAG.to_string()],
                outbound: DIRECT_TAG.to_string(),
            }],
        },
    }
}

/// Конфиг sing-box для узла по его id.
pub async fn server_config(
    db: &DatabaseConnection,
    node_id: &str,
) -> Result<SingboxConfig, AppError> {
    let node = super::node_service::get_node(db, node_id).await?;
    server_config_for(db, &node).await
}

/// Конфиг для уже загруженного узла (путь агента после проверки токена).
pub async fn server_config_for(
    db: &DatabaseConnection,
    node: &nodes::Model,
) -> Result<SingboxConfig, AppError> {
    let subs = subscriptions::Entity::find()
        .filter(subscriptions::Column::ClusterId.eq(node.cluster_id.as_str()))
        .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_asc(subscriptions::Column::CreatedAt)
        .order_by_asc(subscriptions::Column::Id)
        .all(db)
        .await?;
    Ok(to_server_config(node, &subs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_entities::enums::NodeStatus;

    fn node(port: Option<i32>) -> nodes::Model {
        nodes::Model {
            id: "n1".to_string(),
            name: "N1".to_string(),
            hostname: "n1.local".to_string(),
            ip_address: "10.0.0.1".to_string(),
            port,
            api_port: 8081,
            token: "token".to_string(),
            status: NodeStatus::Online,
            version: None,
            country: None,
            city: None,
            cluster_id: "c".to_string(),
            last_heartbeat: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    fn sub(public_id: &str, status: SubscriptionStatus) -> subscriptions::Model {
        subscriptions::Model {
            id: format!("id-{public_id}"),
            public_id: public_id.to_string(),
            name: "S".to_string(),
            user_id: "u".to_string(),
            cluster_id: "c".to_string(),
            status,
            max_connections: 1,
            bandwidth_limit: None,
            expires_at: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_only_active_subscriptions_become_users() {
        let config = to_server_config(
            &node(Some(9000)),
            &[
                sub("a", SubscriptionStatus::Active),
                sub("b", SubscriptionStatus::Suspended),
                sub("c", SubscriptionStatus::Active),
            ],
        );

        let inbound = &config.inbounds[0];
        assert_eq!(inbound.listen_port, 9000);
        assert_eq!(inbound.method, "aes-256-gcm");
        let names: Vec<&str> = inbound.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(inbound.users[0].password, derive_password("a", "n1"));
    }

    #[test]
    fn test_json_shape() {
        let config = to_server_config(&node(None), &[]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["inbounds"][0]["type"], "shadowsocks");
        assert_eq!(json["inbounds"][0]["listen_port"], 8388);
        assert_eq!(json["outbounds"][1]["type"], "block");
        assert_eq!(json["route"]["rules"][0]["inbound"][0], "ss-in");
    }
}
