//! Генерация конфигурации подписки: серверы shadowsocks для каждого узла
//! кластера и ссылки `ss://` для клиентов.

use crate::store::{Store, StoreError, SubscriptionBundle};
use base64::Engine;
use panel_entities::nodes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;
pub const TRANSPORT_TYPE: &str = "shadowsocks";
pub const CIPHER_METHOD: &str = "aes-256-gcm";
pub const DEFAULT_PORT: u16 = 8388;

/// Длина производного пароля в hex-символах.
const PASSWORD_HEX_LEN: usize = 32;

/// Набор encodeURIComponent: экранируется всё, кроме `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Подписка не найдена: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub transport_type: String,
    pub server: String,
    pub port: u16,
    pub method: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub version: u32,
    pub servers: Vec<ServerDescriptor>,
}

/// Формат ответа публичной ссылки подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    Raw,
    #[default]
    Base64,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "raw" => Ok(OutputFormat::Raw),
            "base64" => Ok(OutputFormat::Base64),
            other => Err(format!(
                "Неизвестный формат: {other}. Допустимые: json, raw, base64"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedConfig {
    Json(ConfigDocument),
    Text(String),
}

/// Пароль узла для подписки: SHA-256 от `public_id:node_key`, первые 32 hex-символа.
///
/// Чистая функция: секретов в БД не хранится, повторный вызов даёт тот же результат.
pub fn derive_password(public_id: &str, node_key: &str) -> String {
    let digest = Sha256::digest(format!("{public_id}:{node_key}").as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(PASSWORD_HEX_LEN);
    encoded
}

/// Соль для пароля: id узла, а если он пуст, имя узла.
///
/// У строк из БД id всегда заполнен (это первичный ключ), так что имя
/// используется только для узлов, собранных в памяти и переданных в
/// `to_config_document` напрямую. Два таких узла с одинаковым именем
/// получат одинаковый пароль.
pub fn node_key(node: &nodes::Model) -> &str {
    if node.id.is_empty() {
        &node.name
    } else {
        &node.id
    }
}

/// Порт shadowsocks узла: сохранённый, если он в 1..=65535, иначе 8388.
pub fn effective_port(port: Option<i32>) -> u16 {
    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .unwrap_or(DEFAULT_PORT)
}

pub fn to_config_document(bundle: &SubscriptionBundle) -> ConfigDocument {
    let public_id = &bundle.subscription.public_id;
    let servers = bundle
        .nodes
        .iter()
        .map(|node| ServerDescriptor {
            name: format!("{} - {}", bundle.cluster.name, node.name),
            transport_type: TRANSPORT_TYPE.to_string(),
            server: node.ip_address.clone(),
            port: effective_port(node.port),
            method: CIPHER_METHOD.to_string(),
            password: derive_password(public_id, node_key(node)),
        })
        .collect();

    ConfigDocument {
        version: CONFIG_VERSION,
        servers,
    }
}

/// Ссылки `ss://base64(method:password@host:port)#name`, по одной на сервер.
pub fn to_links(document: &ConfigDocument) -> Vec<String> {
    document
        .servers
        .iter()
        .map(|s| {
            let userinfo = format!("{}:{}@{}:{}", s.method, s.password, s.server, s.port);
            let encoded = base64::engine::general_purpose::STANDARD.encode(userinfo);
            let name = utf8_percent_encode(&s.name, FRAGMENT);
            format!("ss://{encoded}#{name}")
        })
        .collect()
}

pub fn render(document: ConfigDocument, format: OutputFormat) -> RenderedConfig {
    match format {
        OutputFormat::Json => RenderedConfig::Json(document),
        OutputFormat::Raw => RenderedConfig::Text(to_links(&document).join("\n")),
        OutputFormat::Base64 => {
            let raw = to_links(&document).join("\n");
            RenderedConfig::Text(base64::engine::general_purpose::STANDARD.encode(raw))
        }
    }
}

/// Конфигурация по внутреннему id подписки (админский путь).
pub async fn resolve_config<S: Store + ?Sized>(
    store: &S,
    subscription_id: &str,
) -> Result<ConfigDocument, ConfigError> {
    let bundle = store
        .find_subscription_by_id(subscription_id)
        .await?
        .ok_or_else(|| ConfigError::NotFound(subscription_id.to_string()))?;
    Ok(to_config_document(&bundle))
}

/// Конфигурация по публичному токену подписки (путь `/sub/{public_id}`).
pub async fn resolve_config_by_public_id<S: Store + ?Sized>(
    store: &S,
    public_id: &str,
) -> Result<ConfigDocument, ConfigError> {
    let bundle = store
        .find_subscription_by_public_id(public_id)
        .await?
        .ok_or_else(|| ConfigError::NotFound(public_id.to_string()))?;
    Ok(to_config_document(&bundle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_entities::enums::{NodeStatus, SubscriptionStatus};
    use panel_entities::{clusters, subscriptions};

    fn node(id: &str, name: &str, ip: &str, port: Option<i32>) -> nodes::Model {
        nodes::Model {
            id: id.to_string(),
            name: name.to_string(),
            hostname: format!("{}.local", name.to_lowercase()),
            ip_address: ip.to_string(),
            port,
            api_port: 8081,
            token: "token".to_string(),
            status: NodeStatus::Online,
            version: None,
            country: None,
            city: None,
            cluster_id: "cluster-c".to_string(),
            last_heartbeat: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    fn bundle(public_id: &str, nodes: Vec<nodes::Model>) -> SubscriptionBundle {
        SubscriptionBundle {
            subscription: subscriptions::Model {
                id: "sub-internal".to_string(),
                public_id: public_id.to_string(),
                name: "S".to_string(),
                user_id: "user-1".to_string(),
                cluster_id: "cluster-c".to_string(),
                status: SubscriptionStatus::Active,
                max_connections: 1,
                bandwidth_limit: None,
                expires_at: None,
                created_at: "2026-01-01T00:00:00.000000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
            },
            cluster: clusters::Model {
                id: "cluster-c".to_string(),
                name: "C".to_string(),
                cluster_type: "LOAD_BALANCE".to_string(),
                description: None,
                created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            },
            nodes,
        }
    }

    fn two_node_bundle() -> SubscriptionBundle {
        bundle(
            "abc123",
            vec![
                node("n1", "N1", "10.0.0.1", None),
                node("n2", "N2", "10.0.0.2", Some(9000)),
            ],
        )
    }

    #[test]
    fn test_derive_password_is_deterministic() {
        let first = derive_password("abc123", "n1");
        let second = derive_password("abc123", "n1");
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_password_differs_per_subscription() {
        assert_ne!(derive_password("abc123", "n1"), derive_password("abc124", "n1"));
        assert_ne!(derive_password("abc123", "n1"), derive_password("abc123", "n2"));
    }

    #[test]
    fn test_config_document_for_two_nodes() {
        let doc = to_config_document(&two_node_bundle());

        assert_eq!(doc.version, 1);
        assert_eq!(doc.servers.len(), 2);

        let first = &doc.servers[0];
        assert_eq!(first.name, "C - N1");
        assert_eq!(first.server, "10.0.0.1");
        assert_eq!(first.port, 8388);
        assert_eq!(first.method, "aes-256-gcm");
        assert_eq!(first.transport_type, "shadowsocks");

        let second = &doc.servers[1];
        assert_eq!(second.name, "C - N2");
        assert_eq!(second.server, "10.0.0.2");
        assert_eq!(second.port, 9000);

        assert!(!first.password.is_empty());
        assert!(!second.password.is_empty());
        assert_ne!(first.password, second.password);
    }

    #[test]
    fn test_zero_and_invalid_ports_fall_back_to_default() {
        let doc = to_config_document(&bundle(
            "p",
            vec![
                node("a", "A", "1.1.1.1", Some(0)),
                node("b", "B", "1.1.1.2", Some(70000)),
                node("c", "C", "1.1.1.3", Some(-1)),
            ],
        ));
        assert!(doc.servers.iter().all(|s| s.port == DEFAULT_PORT));
    }

    #[test]
    fn test_node_without_id_uses_name_as_salt() {
        let doc = to_config_document(&bundle("p", vec![node("", "Solo", "1.1.1.1", None)]));
        assert_eq!(doc.servers[0].password, derive_password("p", "Solo"));
    }

    #[test]
    fn test_empty_cluster_yields_empty_document() {
        let doc = to_config_document(&bundle("p", Vec::new()));
        assert!(doc.servers.is_empty());
        assert!(to_links(&doc).is_empty());
    }

    #[test]
    fn test_links_match_servers() {
        let doc = to_config_document(&two_node_bundle());
        let links = to_links(&doc);
        assert_eq!(links.len(), 2);

        let (body, name) = links[0]
            .strip_prefix("ss://")
            .and_then(|rest| rest.split_once('#'))
            .unwrap();
        assert_eq!(name, "C%20-%20N1");

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(body)
            .unwrap();
        let expected = format!("aes-256-gcm:{}@10.0.0.1:8388", doc.servers[0].password);
        assert_eq!(String::from_utf8(decoded).unwrap(), expected);
    }

    #[test]
    fn test_base64_render_decodes_to_raw() {
        let doc = to_config_document(&two_node_bundle());

        let RenderedConfig::Text(raw) = render(doc.clone(), OutputFormat::Raw) else {
            panic!("raw должен быть текстом");
        };
        let RenderedConfig::Text(b64) = render(doc.clone(), OutputFormat::Base64) else {
            panic!("base64 должен быть текстом");
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), raw);
        assert_eq!(raw.lines().count(), 2);

        assert_eq!(render(doc.clone(), OutputFormat::Json), RenderedConfig::Json(doc));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("raw".parse::<OutputFormat>(), Ok(OutputFormat::Raw));
        assert_eq!("base64".parse::<OutputFormat>(), Ok(OutputFormat::Base64));
        assert_eq!(OutputFormat::default(), OutputFormat::Base64);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
