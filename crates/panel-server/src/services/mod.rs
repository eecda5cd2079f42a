//! Бизнес-логика панели.

pub mod admin_service;
pub mod cleanup_service;
pub mod cluster_service;
pub mod import_service;
pub mod node_service;
pub mod singbox_config;
pub mod subscription_config;
pub mod subscription_service;
pub mod traffic_service;
pub mod user_service;
