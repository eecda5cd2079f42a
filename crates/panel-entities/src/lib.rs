//! Entity-модели панели: кластеры, узлы, пользователи, подписки, трафик.

pub mod byte_count;
pub mod clusters;
pub mod enums;
pub mod nodes;
pub mod subscriptions;
pub mod traffic_records;
pub mod users;
