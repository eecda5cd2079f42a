//! Импорт пользователей и подписок из внешней системы.
//!
//! Каждая запись обрабатывается отдельно: ошибка одной записи попадает в
//! `ImportResult::errors`, пакет всегда доходит до конца. Записи приходят
//! сырым JSON и разбираются по одной, так что запись с полем не того типа
//! не роняет весь пакет.

use crate::store::{NewCluster, Store, StoreError, SubscriptionUpsert, UpsertOutcome, UserUpsert};
use chrono::{DateTime, SecondsFormat, Utc};
use panel_entities::byte_count::ByteCount;
use panel_entities::enums::{SubscriptionStatus, UserRole, UserStatus};
use panel_entities::users;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Имя кластера, создаваемого при импорте в пустую БД.
pub const PLACEHOLDER_CLUSTER_NAME: &str = "Imported";

/// Пакет импорта. Записи хранятся как есть и разбираются в `import_batch`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    #[serde(default)]
    pub users: Vec<Value>,
    #[serde(default)]
    pub subscriptions: Vec<Value>,
    pub default_cluster_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub cluster_id: Option<String>,
    pub traffic_limit: Option<u64>,
    pub expire_date: Option<String>,
    #[serde(default)]
    pub subscriptions: Vec<Value>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSubscription {
    pub short_id: Option<String>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub cluster_id: Option<String>,
    pub status: Option<String>,
    pub max_connections: Option<u32>,
    pub bandwidth_limit: Option<u64>,
    pub expires_at: Option<String>,
}

impl ImportSubscription {
    /// Естественный ключ записи: shortId, затем uuid.
    fn natural_key(&self) -> Option<&str> {
        self.short_id
            .as_deref()
            .or(self.uuid.as_deref())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub users_created: u32,
    pub users_updated: u32,
    pub subscriptions_created: u32,
    pub subscriptions_updated: u32,
    pub errors: Vec<String>,
}

impl ImportResult {
    fn count_user(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.users_created += 1,
            UpsertOutcome::Updated => self.users_updated += 1,
        }
    }

    fn count_subscription(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.subscriptions_created += 1,
            UpsertOutcome::Updated => self.subscriptions_updated += 1,
        }
    }
}

/// Причина отказа по одной записи.
#[derive(Debug)]
enum RecordError {
    /// Запись неполна или некорректна
    Skip(String),
    Store(StoreError),
}

impl From<StoreError> for RecordError {
    fn from(e: StoreError) -> Self {
        RecordError::Store(e)
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Skip(reason) => write!(f, "{reason}"),
            RecordError::Store(e) => write!(f, "{e}"),
        }
    }
}

/// Состояние одного вызова импорта.
struct Reconciler<'a, S: Store + ?Sized> {
    store: &'a S,
    requested_cluster_id: Option<String>,
    default_cluster_id: Option<String>,
    handled_keys: HashSet<String>,
    result: ImportResult,
}

impl<'a, S: Store + ?Sized> Reconciler<'a, S> {
    /// Кластер по умолчанию: запрошенный, иначе самый ранний, иначе новый.
    /// Вычисляется один раз на вызов импорта.
    async fn default_cluster(&mut self) -> Result<String, StoreError> {
        if let Some(id) = &self.default_cluster_id {
            return Ok(id.clone());
        }

        let mut resolved = None;
        if let Some(requested) = self.requested_cluster_id.as_deref() {
            resolved = self.store.find_cluster_by_id(requested).await?;
            if resolved.is_none() {
                tracing::warn!("Кластер импорта {requested} не найден, выбираю другой");
            }
        }
        if resolved.is_none() {
            resolved = self.store.find_first_cluster_by_creation().await?;
        }
        let cluster = match resolved {
            Some(cluster) => cluster,
            None => {
                tracing::info!("Кластеров нет, создаю {PLACEHOLDER_CLUSTER_NAME}");
                self.store
                    .create_cluster(NewCluster {
                        name: PLACEHOLDER_CLUSTER_NAME.to_string(),
                        cluster_type: "LOAD_BALANCE".to_string(),
                        description: Some("Создан автоматически при импорте".to_string()),
                    })
                    .await?
            }
        };

        self.default_cluster_id = Some(cluster.id.clone());
        Ok(cluster.id)
    }

    async fn explicit_cluster(
        &self,
        cluster_id: Option<&str>,
    ) -> Result<Option<String>, RecordError> {
        let Some(id) = cluster_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        match self.store.find_cluster_by_id(id).await? {
            Some(cluster) => Ok(Some(cluster.id)),
            None => Err(RecordError::Skip(format!("неизвестный кластер {id}"))),
        }
    }

    async fn import_user(&mut self, record: ImportUser) -> Result<users::Model, RecordError> {
        let email = record
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| RecordError::Skip("отсутствует email".to_string()))?;
        let default_cluster = self.default_cluster().await?;

        let mut cluster_id = self.explicit_cluster(record.cluster_id.as_deref()).await?;
        // Существующему пользователю кластер без явного указания не переназначаем
        if cluster_id.is_none() && self.store.find_user_by_email(&email).await?.is_none() {
            cluster_id = Some(default_cluster);
        }

        let data = UserUpsert {
            email,
            password: record
                .password
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: record.name,
            role: record.role.as_deref().map(parse_role).transpose()?,
            status: record.status.as_deref().map(parse_user_status).transpose()?,
            cluster_id,
            traffic_limit: record.traffic_limit.map(ByteCount),
            expire_date: record.expire_date.as_deref().map(normalize_date).transpose()?,
        };

        let (user, outcome) = self.store.upsert_user_by_email(data).await?;
        self.result.count_user(outcome);
        Ok(user)
    }

    /// Владелец подписки: userId, затем userEmail.
    async fn resolve_owner(
        &self,
        record: &ImportSubscription,
    ) -> Result<users::Model, RecordError> {
        if let Some(id) = record.user_id.as_deref().filter(|id| !id.is_empty()) {
            if let Some(user) = self.store.find_user_by_id(id).await? {
                return Ok(user);
            }
        }
        if let Some(email) = record.user_email.as_deref().filter(|e| !e.is_empty()) {
            if let Some(user) = self.store.find_user_by_email(email).await? {
                return Ok(user);
            }
        }
        Err(RecordError::Skip("не удалось определить пользователя".to_string()))
    }

    async fn import_subscription(
        &mut self,
        record: ImportSubscription,
        owner: &users::Model,
    ) -> Result<UpsertOutcome, RecordError> {
        let default_cluster = self.default_cluster().await?;
        let public_id = record
            .natural_key()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let data = SubscriptionUpsert {
            public_id: public_id.clone(),
            user_id: owner.id.clone(),
            cluster_id: self.explicit_cluster(record.cluster_id.as_deref()).await?,
            fallback_cluster_id: owner.cluster_id.clone().unwrap_or(default_cluster),
            name: record.name,
            status: record
                .status
                .as_deref()
                .map(parse_subscription_status)
                .transpose()?,
            max_connections: record
                .max_connections
                .map(|m| {
                    i32::try_from(m).map_err(|_| {
                        RecordError::Skip(format!("maxConnections вне диапазона: {m}"))
                    })
                })
                .transpose()?,
            bandwidth_limit: record.bandwidth_limit.map(ByteCount),
            expires_at: record.expires_at.as_deref().map(normalize_date).transpose()?,
        };

        let (_, outcome) = self.store.upsert_subscription_by_public_id(data).await?;
        self.handled_keys.insert(public_id);
        self.result.count_subscription(outcome);
        Ok(outcome)
    }

    async fn run_user(&mut self, raw: Value) {
        let label = raw_label(&raw, &["email"]).unwrap_or_else(|| "<без email>".to_string());
        let mut record = match ImportUser::deserialize(&raw) {
            Ok(record) => record,
            Err(e) => {
                self.record_error(format!("пользователь {label}: некорректная запись: {e}"));
                let nested = raw
                    .get("subscriptions")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                self.skip_nested(nested, &label);
                return;
            }
        };
        let nested = std::mem::take(&mut record.subscriptions);

        let user = match self.import_user(record).await {
            Ok(user) => user,
            Err(e) => {
                self.record_error(format!("пользователь {label}: {e}"));
                self.skip_nested(&nested, &label);
                return;
            }
        };

        for raw_sub in nested {
            let key = subscription_label(&raw_sub);
            let sub: ImportSubscription = match serde_json::from_value(raw_sub) {
                Ok(sub) => sub,
                Err(e) => {
                    self.record_error(format!(
                        "подписка {key} ({label}): некорректная запись: {e}"
                    ));
                    continue;
                }
            };
            if let Err(e) = self.import_subscription(sub, &user).await {
                self.record_error(format!("подписка {key} ({label}): {e}"));
            }
        }
    }

    /// Вложенные подписки пользователя, который не импортирован.
    fn skip_nested(&mut self, nested: &[Value], label: &str) {
        for raw_sub in nested {
            let key = subscription_label(raw_sub);
            self.record_error(format!(
                "подписка {key} ({label}): пропущена, пользователь не импортирован"
            ));
        }
    }

    async fn run_subscription(&mut self, raw: Value) {
        let label = subscription_label(&raw);
        let record: ImportSubscription = match serde_json::from_value(raw) {
            Ok(record) => record,
            Err(e) => {
                self.record_error(format!("подписка {label}: некорректная запись: {e}"));
                return;
            }
        };
        if let Some(key) = record.natural_key() {
            if self.handled_keys.contains(key) {
                return;
            }
        }

        let outcome = match self.resolve_owner(&record).await {
            Ok(owner) => self.import_subscription(record, &owner).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            self.record_error(format!("подписка {label}: {e}"));
        }
    }

    fn record_error(&mut self, message: String) {
        tracing::warn!("Импорт: {message}");
        self.result.errors.push(message);
    }
}

/// Слить пакет внешних пользователей и подписок в локальную БД.
pub async fn import_batch<S: Store + ?Sized>(store: &S, payload: ImportPayload) -> ImportResult {
    let mut reconciler = Reconciler {
        store,
        requested_cluster_id: payload.default_cluster_id.filter(|id| !id.is_empty()),
        default_cluster_id: None,
        handled_keys: HashSet::new(),
        result: ImportResult::default(),
    };

    for user in payload.users {
        reconciler.run_user(user).await;
    }
    for sub in payload.subscriptions {
        reconciler.run_subscription(sub).await;
    }

    let result = reconciler.result;
    tracing::info!(
        "Импорт завершён: пользователи +{} ~{}, подписки +{} ~{}, ошибок {}",
        result.users_created,
        result.users_updated,
        result.subscriptions_created,
        result.subscriptions_updated,
        result.errors.len()
    );
    result
}

fn parse_role(value: &str) -> Result<UserRole, RecordError> {
    match value.to_uppercase().as_str() {
        "ADMIN" => Ok(UserRole::Admin),
        "USER" => Ok(UserRole::User),
        other => Err(RecordError::Skip(format!("неизвестная роль {other}"))),
    }
}

fn parse_user_status(value: &str) -> Result<UserStatus, RecordError> {
    match value.to_uppercase().as_str() {
        "ACTIVE" => Ok(UserStatus::Active),
        "DISABLED" => Ok(UserStatus::Disabled),
        "EXPIRED" => Ok(UserStatus::Expired),
        other => Err(RecordError::Skip(format!(
            "неизвестный статус пользователя {other}"
        ))),
    }
}

fn parse_subscription_status(value: &str) -> Result<SubscriptionStatus, RecordError> {
    match value.to_uppercase().as_str() {
        "ACTIVE" => Ok(SubscriptionStatus::Active),
        "EXPIRED" => Ok(SubscriptionStatus::Expired),
        "SUSPENDED" => Ok(SubscriptionStatus::Suspended),
        other => Err(RecordError::Skip(format!(
            "неизвестный статус подписки {other}"
        ))),
    }
}

/// Первое непустое строковое поле записи из `keys`.
fn raw_label(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(key).and_then(Value::as_str))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn subscription_label(raw: &Value) -> String {
    raw_label(raw, &["shortId", "uuid"]).unwrap_or_else(|| "<новая>".to_string())
}

/// Дата в RFC 3339, приводится к UTC в формате `timestamp_now`.
fn normalize_date(value: &str) -> Result<String, RecordError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| {
            d.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Micros, true)
        })
        .map_err(|_| RecordError::Skip(format!("некорректная дата {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SeaOrmStore, SubscriptionBundle};
    use async_trait::async_trait;
    use panel_entities::{clusters, subscriptions};
    use panel_migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, EntityTrait, PaginatorTrait};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn test_store() -> (SeaOrmStore, sea_orm::DatabaseConnection) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        (SeaOrmStore::new(db.clone()), db)
    }

    fn payload(json: serde_json::Value) -> ImportPayload {
        serde_json::from_value(json).unwrap()
    }

    /// Обёртка, считающая вызовы create_cluster.
    struct CountingStore {
        inner: SeaOrmStore,
        cluster_creates: AtomicUsize,
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn find_cluster_by_id(
            &self,
            id: &str,
        ) -> Result<Option<clusters::Model>, StoreError> {
            self.inner.find_cluster_by_id(id).await
        }

        async fn find_first_cluster_by_creation(
            &self,
        ) -> Result<Option<clusters::Model>, StoreError> {
            self.inner.find_first_cluster_by_creation().await
        }

        async fn create_cluster(&self, data: NewCluster) -> Result<clusters::Model, StoreError> {
            self.cluster_creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_cluster(data).await
        }

        async fn find_user_by_id(&self, id: &str) -> Result<Option<users::Model>, StoreError> {
            self.inner.find_user_by_id(id).await
        }

        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> Result<Option<users::Model>, StoreError> {
            self.inner.find_user_by_email(email).await
        }

        async fn upsert_user_by_email(
            &self,
            data: UserUpsert,
        ) -> Result<(users::Model, UpsertOutcome), StoreError> {
            self.inner.upsert_user_by_email(data).await
        }

        async fn find_subscription_by_id(
            &self,
            id: &str,
        ) -> Result<Option<SubscriptionBundle>, StoreError> {
            self.inner.find_subscription_by_id(id).await
        }

        async fn find_subscription_by_public_id(
            &self,
            public_id: &str,
        ) -> Result<Option<SubscriptionBundle>, StoreError> {
            self.inner.find_subscription_by_public_id(public_id).await
        }

        async fn upsert_subscription_by_public_id(
            &self,
            data: SubscriptionUpsert,
        ) -> Result<(subscriptions::Model, UpsertOutcome), StoreError> {
            self.inner.upsert_subscription_by_public_id(data).await
        }
    }

    #[tokio::test]
    async fn test_user_import_is_idempotent() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({ "users": [{ "email": "a@x.com" }] });

        let first = import_batch(&store, payload(body.clone())).await;
        assert_eq!(first.users_created, 1);
        assert_eq!(first.users_updated, 0);
        assert!(first.errors.is_empty());

        let second = import_batch(&store, payload(body)).await;
        assert_eq!(second.users_created, 0);
        assert_eq!(second.users_updated, 1);
        assert!(second.errors.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_without_resolvable_user_is_reported() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "subscriptions": [{ "shortId": "s1", "userEmail": "missing@x.com" }]
        });

        let result = import_batch(&store, payload(body)).await;
        assert_eq!(result.subscriptions_created, 0);
        assert_eq!(result.subscriptions_updated, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("s1"));
    }

    #[tokio::test]
    async fn test_placeholder_cluster_created_once() {
        let (inner, db) = test_store().await;
        let store = CountingStore {
            inner,
            cluster_creates: AtomicUsize::new(0),
        };
        let body = serde_json::json!({
            "users": [
                { "email": "a@x.com", "subscriptions": [{ "shortId": "a1" }] },
                { "email": "b@x.com" },
                { "email": "c@x.com" }
            ],
            "subscriptions": [{ "shortId": "c1", "userEmail": "c@x.com" }]
        });

        let result = import_batch(&store, payload(body)).await;
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.users_created, 3);
        assert_eq!(result.subscriptions_created, 2);
        assert_eq!(store.cluster_creates.load(Ordering::SeqCst), 1);
        assert_eq!(clusters::Entity::find().count(&db).await.unwrap(), 1);

        let cluster = clusters::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(cluster.name, PLACEHOLDER_CLUSTER_NAME);
        let subs = subscriptions::Entity::find().all(&db).await.unwrap();
        assert!(subs.iter().all(|s| s.cluster_id == cluster.id));
    }

    #[tokio::test]
    async fn test_default_cluster_prefers_requested_then_earliest() {
        let (store, _db) = test_store().await;
        let first = store
            .create_cluster(NewCluster {
                name: "First".to_string(),
                cluster_type: "LOAD_BALANCE".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let second = store
            .create_cluster(NewCluster {
                name: "Second".to_string(),
                cluster_type: "LOAD_BALANCE".to_string(),
                description: None,
            })
            .await
            .unwrap();

        import_batch(
            &store,
            payload(serde_json::json!({
                "defaultClusterId": second.id,
                "users": [{ "email": "requested@x.com" }]
            })),
        )
        .await;
        let user = store.find_user_by_email("requested@x.com").await.unwrap().unwrap();
        assert_eq!(user.cluster_id.as_deref(), Some(second.id.as_str()));

        import_batch(
            &store,
            payload(serde_json::json!({
                "defaultClusterId": "does-not-exist",
                "users": [{ "email": "fallback@x.com" }]
            })),
        )
        .await;
        let user = store.find_user_by_email("fallback@x.com").await.unwrap().unwrap();
        assert_eq!(user.cluster_id.as_deref(), Some(first.id.as_str()));
    }

    #[tokio::test]
    async fn test_subscription_upsert_by_short_id() {
        let (store, _db) = test_store().await;
        let create = serde_json::json!({
            "users": [{ "email": "a@x.com" }],
            "subscriptions": [{ "shortId": "s1", "userEmail": "a@x.com" }]
        });
        let result = import_batch(&store, payload(create)).await;
        assert_eq!(result.subscriptions_created, 1);

        let bundle = store.find_subscription_by_public_id("s1").await.unwrap().unwrap();
        assert_eq!(bundle.subscription.status, SubscriptionStatus::Active);
        assert_eq!(bundle.subscription.max_connections, 1);

        let update = serde_json::json!({
            "subscriptions": [{
                "shortId": "s1",
                "userEmail": "a@x.com",
                "status": "SUSPENDED",
                "maxConnections": 3,
                "bandwidthLimit": 1073741824u64
            }]
        });
        let result = import_batch(&store, payload(update)).await;
        assert_eq!(result.subscriptions_created, 0);
        assert_eq!(result.subscriptions_updated, 1);

        let bundle = store.find_subscription_by_public_id("s1").await.unwrap().unwrap();
        assert_eq!(bundle.subscription.status, SubscriptionStatus::Suspended);
        assert_eq!(bundle.subscription.max_connections, 3);
        assert_eq!(bundle.subscription.bandwidth_limit, Some(ByteCount(1_073_741_824)));
    }

    #[tokio::test]
    async fn test_nested_subscription_not_imported_twice() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "users": [{ "email": "a@x.com", "subscriptions": [{ "uuid": "u-1" }] }],
            "subscriptions": [{ "uuid": "u-1", "userEmail": "a@x.com" }]
        });

        let result = import_batch(&store, payload(body)).await;
        assert_eq!(result.subscriptions_created, 1);
        assert_eq!(result.subscriptions_updated, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_bad_records_do_not_abort_batch() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "users": [
                { "name": "без email" },
                { "email": "bad-role@x.com", "role": "ROOT" },
                { "email": "ok@x.com", "expireDate": "2027-01-01T00:00:00+03:00" }
            ],
            "subscriptions": [
                { "shortId": "s-bad", "userEmail": "ok@x.com", "expiresAt": "завтра" },
                { "userEmail": "ok@x.com" }
            ]
        });

        let result = import_batch(&store, payload(body)).await;
        assert_eq!(result.users_created, 1);
        assert_eq!(result.subscriptions_created, 1);
        assert_eq!(result.errors.len(), 3);

        let user = store.find_user_by_email("ok@x.com").await.unwrap().unwrap();
        assert_eq!(
            user.expire_date.as_deref(),
            Some("2026-12-31T21:00:00.000000Z")
        );
    }

    #[tokio::test]
    async fn test_existing_user_keeps_password_and_cluster() {
        let (store, _db) = test_store().await;
        import_batch(
            &store,
            payload(serde_json::json!({
                "users": [{ "email": "a@x.com", "password": "secret-hash" }]
            })),
        )
        .await;
        let before = store.find_user_by_email("a@x.com").await.unwrap().unwrap();

        let result = import_batch(
            &store,
            payload(serde_json::json!({
                "users": [{ "email": "a@x.com", "name": "Alice", "status": "DISABLED" }]
            })),
        )
        .await;
        assert_eq!(result.users_updated, 1);

        let after = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.password, "secret-hash");
        assert_eq!(after.cluster_id, before.cluster_id);
        assert_eq!(after.name.as_deref(), Some("Alice"));
        assert_eq!(after.status, UserStatus::Disabled);
    }

    #[tokio::test]
    async fn test_wrong_typed_fields_fail_only_their_record() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "users": [
                { "email": "good1@x.com" },
                {
                    "email": "bad@x.com",
                    "trafficLimit": -5,
                    "subscriptions": [{ "shortId": "b1" }]
                },
                { "email": 42 },
                { "email": "good2@x.com", "subscriptions": [{ "shortId": "g2", "maxConnections": "3" }] }
            ],
            "subscriptions": [
                { "shortId": "g1", "userEmail": "good1@x.com", "bandwidthLimit": "много" },
                { "shortId": "g1b", "userEmail": "good1@x.com" }
            ]
        });

        let result = import_batch(&store, payload(body)).await;
        assert_eq!(result.users_created, 2);
        assert_eq!(result.subscriptions_created, 1);
        assert_eq!(result.errors.len(), 5, "{:?}", result.errors);
        assert!(result.errors[0].starts_with("пользователь bad@x.com"));
        assert!(result.errors[1].contains("b1 (bad@x.com)"));
        assert!(result.errors[1].contains("пользователь не импортирован"));
        assert!(result.errors[2].starts_with("пользователь <без email>"));
        assert!(result.errors[3].contains("g2 (good2@x.com)"));
        assert!(result.errors[4].starts_with("подписка g1:"));

        assert!(store.find_user_by_email("bad@x.com").await.unwrap().is_none());
        assert!(store.find_subscription_by_public_id("g1b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_user_reports_each_nested_subscription() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "users": [{
                "email": "a@x.com",
                "role": "ROOT",
                "subscriptions": [{ "shortId": "s1" }, { "uuid": "u-2" }]
            }]
        });

        let result = import_batch(&store, payload(body)).await;
        assert_eq!(result.users_created, 0);
        assert_eq!(
            result.errors,
            vec![
                "пользователь a@x.com: неизвестная роль ROOT".to_string(),
                "подписка s1 (a@x.com): пропущена, пользователь не импортирован".to_string(),
                "подписка u-2 (a@x.com): пропущена, пользователь не импортирован".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_limits_accept_full_u64_range() {
        let (store, _db) = test_store().await;
        let body = serde_json::json!({
            "users": [{
                "email": "a@x.com",
                "trafficLimit": 18446744073709551615u64,
                "subscriptions": [{ "shortId": "big", "bandwidthLimit": 18446744073709551615u64 }]
            }]
        });

        let result = import_batch(&store, payload(body)).await;
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.subscriptions_created, 1);

        let bundle = store.find_subscription_by_public_id("big").await.unwrap().unwrap();
        assert_eq!(bundle.subscription.bandwidth_limit, Some(ByteCount(u64::MAX)));
        let user = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.traffic_limit, Some(ByteCount(u64::MAX)));
    }

    #[tokio::test]
    async fn test_empty_payload_creates_nothing() {
        let (store, db) = test_store().await;
        let result = import_batch(&store, ImportPayload::default()).await;
        assert_eq!(result, ImportResult::default());
        assert_eq!(clusters::Entity::find().count(&db).await.unwrap(), 0);
    }
}
