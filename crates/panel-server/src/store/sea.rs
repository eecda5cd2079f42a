//! Реализация `Store` поверх sea-orm.

use super::{
    timestamp_now, NewCluster, Store, StoreError, SubscriptionBundle, SubscriptionUpsert,
    UpsertOutcome, UserUpsert,
};
use async_trait::async_trait;
use panel_entities::enums::{SubscriptionStatus, UserRole, UserStatus};
use panel_entities::{clusters, nodes, subscriptions, users};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load_bundle(
        &self,
        subscription: subscriptions::Model,
    ) -> Result<SubscriptionBundle, StoreError> {
        let cluster = clusters::Entity::find_by_id(subscription.cluster_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StoreError::Integrity(format!(
                    "подписка {} ссылается на несуществующий кластер {}",
                    subscription.id, subscription.cluster_id
                ))
            })?;

        let nodes = nodes::Entity::find()
            .filter(nodes::Column::ClusterId.eq(&cluster.id))
            .order_by_asc(nodes::Column::CreatedAt)
            .order_by_asc(nodes::Column::Id)
            .all(&self.db)
            .await?;

        Ok(SubscriptionBundle {
            subscription,
            cluster,
            nodes,
        })
    }

    async fn update_user(
        &self,
        record: users::Model,
        data: UserUpsert,
    ) -> Result<users::Model, StoreError> {
        let mut model: users::ActiveModel = record.into();
        if let Some(name) = data.name {
            model.name = Set(Some(name));
        }
        if let Some(role) = data.role {
            model.role = Set(role);
        }
        if let Some(status) = data.status {
            model.status = Set(status);
        }
        if let Some(cluster_id) = data.cluster_id {
            model.cluster_id = Set(Some(cluster_id));
        }
        if let Some(limit) = data.traffic_limit {
            model.traffic_limit = Set(Some(limit));
        }
        if let Some(expire) = data.expire_date {
            model.expire_date = Set(Some(expire));
        }
        model.updated_at = Set(timestamp_now());
        Ok(model.update(&self.db).await?)
    }

    async fn update_subscription(
        &self,
        record: subscriptions::Model,
        data: SubscriptionUpsert,
    ) -> Result<subscriptions::Model, StoreError> {
        let mut model: subscriptions::ActiveModel = record.into();
        model.user_id = Set(data.user_id);
        if let Some(cluster_id) = data.cluster_id {
            model.cluster_id = Set(cluster_id);
        }
        if let Some(name) = data.name {
            model.name = Set(name);
        }
        if let Some(status) = data.status {
            model.status = Set(status);
        }
        if let Some(max) = data.max_connections {
            model.max_connections = Set(max);
        }
        if let Some(limit) = data.bandwidth_limit {
            model.bandwidth_limit = Set(Some(limit));
        }
        if let Some(expires) = data.expires_at {
            model.expires_at = Set(Some(expires));
        }
        model.updated_at = Set(timestamp_now());
        Ok(model.update(&self.db).await?)
    }

    async fn find_subscription_row(
        &self,
        public_id: &str,
    ) -> Result<Option<subscriptions::Model>, StoreError> {
        Ok(subscriptions::Entity::find()
            .filter(subscriptions::Column::PublicId.eq(public_id))
            .one(&self.db)
            .await?)
    }
}

#[async_trait]
impl Store for SeaOrmStore {
    async fn find_cluster_by_id(&self, id: &str) -> Result<Option<clusters::Model>, StoreError> {
        Ok(clusters::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_first_cluster_by_creation(
        &self,
    ) -> Result<Option<clusters::Model>, StoreError> {
        Ok(clusters::Entity::find()
            .order_by_asc(clusters::Column::CreatedAt)
            .order_by_asc(clusters::Column::Id)
            .one(&self.db)
            .await?)
    }

    async fn create_cluster(&self, data: NewCluster) -> Result<clusters::Model, StoreError> {
        let model = clusters::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(data.name),
            cluster_type: Set(data.cluster_type),
            description: Set(data.description),
            created_at: Set(timestamp_now()),
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<users::Model>, StoreError> {
        Ok(users::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, StoreError> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn upsert_user_by_email(
        &self,
        data: UserUpsert,
    ) -> Result<(users::Model, UpsertOutcome), StoreError> {
        if let Some(existing) = self.find_user_by_email(&data.email).await? {
            let updated = self.update_user(existing, data).await?;
            return Ok((updated, UpsertOutcome::Updated));
        }

        let now = timestamp_now();
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(data.email.clone()),
            password: Set(data.password.clone()),
            name: Set(data.name.clone()),
            role: Set(data.role.unwrap_or(UserRole::User)),
            status: Set(data.status.unwrap_or(UserStatus::Active)),
            cluster_id: Set(data.cluster_id.clone()),
            traffic_limit: Set(data.traffic_limit),
            expire_date: Set(data.expire_date.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok((created, UpsertOutcome::Created)),
            // Параллельный импорт мог вставить ту же запись между find и insert
            Err(err) => match self.find_user_by_email(&data.email).await? {
                Some(existing) => {
                    let updated = self.update_user(existing, data).await?;
                    Ok((updated, UpsertOutcome::Updated))
                }
                None => Err(err.into()),
            },
        }
    }

    async fn find_subscription_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SubscriptionBundle>, StoreError> {
        match subscriptions::Entity::find_by_id(id).one(&self.db).await? {
            Some(subscription) => Ok(Some(self.load_bundle(subscription).await?)),
            None => Ok(None),
        }
    }

    async fn find_subscription_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Option<SubscriptionBundle>, StoreError> {
        match self.find_subscription_row(public_id).await? {
            Some(subscription) => Ok(Some(self.load_bundle(subscription).await?)),
            None => Ok(None),
        }
    }

    async fn upsert_subscription_by_public_id(
        &self,
        data: SubscriptionUpsert,
    ) -> Result<(subscriptions::Model, UpsertOutcome), StoreError> {
        if let Some(existing) = self.find_subscription_row(&data.public_id).await? {
            let updated = self.update_subscription(existing, data).await?;
            return Ok((updated, UpsertOutcome::Updated));
        }

        let now = timestamp_now();
        let cluster_id = data
            .cluster_id
            .clone()
            .unwrap_or_else(|| data.fallback_cluster_id.clone());
        let model = subscriptions::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            public_id: Set(data.public_id.clone()),
            name: Set(data
                .name
                .clone()
                .unwrap_or_else(|| format!("Subscription {}", data.public_id))),
            user_id: Set(data.user_id.clone()),
            cluster_id: Set(cluster_id),
            status: Set(data.status.unwrap_or(SubscriptionStatus::Active)),
            max_connections: Set(data.max_connections.unwrap_or(1)),
            bandwidth_limit: Set(data.bandwidth_limit),
            expires_at: Set(data.expires_at.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok((created, UpsertOutcome::Created)),
            Err(err) => match self.find_subscription_row(&data.public_id).await? {
                Some(existing) => {
                    let updated = self.update_subscription(existing, data).await?;
                    Ok((updated, UpsertOutcome::Updated))
                }
                None => Err(err.into()),
            },
        }
    }
}
