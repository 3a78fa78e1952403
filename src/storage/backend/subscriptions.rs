//! Web Push 订阅

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_subscription;
use crate::errors::Result;
use crate::storage::models::PushSubscription;

use migration::entities::push_subscription;

impl SeaOrmStorage {
    /// 按 endpoint upsert；已存在的 endpoint 归属到当前用户并更新密钥
    pub async fn upsert_subscription(
        &self,
        user_id: i32,
        endpoint: &str,
        p256dh_key: &str,
        auth_key: &str,
    ) -> Result<PushSubscription> {
        use sea_orm::ActiveValue::*;

        let existing = push_subscription::Entity::find()
            .filter(push_subscription::Column::Endpoint.eq(endpoint))
            .one(&self.db)
            .await?;

        let model = match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.user_id = Set(user_id);
                active.p256dh_key = Set(p256dh_key.to_string());
                active.auth_key = Set(auth_key.to_string());
                active.update(&self.db).await?
            }
            None => {
                push_subscription::ActiveModel {
                    id: NotSet,
                    user_id: Set(user_id),
                    endpoint: Set(endpoint.to_string()),
                    p256dh_key: Set(p256dh_key.to_string()),
                    auth_key: Set(auth_key.to_string()),
                    created_at: Set(Utc::now()),
                }
                .insert(&self.db)
                .await?
            }
        };

        info!("Push subscription saved for user {}", user_id);
        Ok(model_to_subscription(model))
    }

    /// 删除当前用户的订阅，返回是否删除了记录
    pub async fn delete_subscription(&self, user_id: i32, endpoint: &str) -> Result<bool> {
        let result = push_subscription::Entity::delete_many()
            .filter(push_subscription::Column::UserId.eq(user_id))
            .filter(push_subscription::Column::Endpoint.eq(endpoint))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 推送服务返回 404/410 时清理
    pub async fn delete_subscription_by_id(&self, id: i32) -> Result<()> {
        push_subscription::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        info!("Expired push subscription {} removed", id);
        Ok(())
    }

    pub async fn subscriptions_for_user(&self, user_id: i32) -> Result<Vec<PushSubscription>> {
        let models = push_subscription::Entity::find()
            .filter(push_subscription::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_subscription).collect())
    }
}
