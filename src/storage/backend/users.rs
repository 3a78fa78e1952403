//! 用户读写

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, SqlErr};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_user;
use super::retry;
use crate::errors::{MediRemindError, Result};
use crate::storage::models::{User, UserProfileUpdate};

use migration::entities::user;

impl SeaOrmStorage {
    /// 注册用户，email 重复返回 Conflict
    pub async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User> {
        self.create_user_with_name(email, hashed_password, None).await
    }

    /// 单次插入完成注册，`full_name` 需在调用前校验
    pub async fn create_user_with_name(
        &self,
        email: &str,
        hashed_password: &str,
        full_name: Option<&str>,
    ) -> Result<User> {
        use sea_orm::ActiveValue::*;

        if self.find_user_by_email(email).await?.is_some() {
            return Err(MediRemindError::conflict("Email already registered"));
        }

        let active = user::ActiveModel {
            id: NotSet,
            email: Set(email.to_string()),
            hashed_password: Set(hashed_password.to_string()),
            is_active: Set(true),
            full_name: Set(full_name.map(str::to_string)),
            phone_number: Set(None),
            email_notifications: Set(false),
            created_at: Set(Utc::now()),
        };

        // 并发注册时以唯一索引为准
        let model = active.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                MediRemindError::conflict("Email already registered")
            }
            _ => MediRemindError::database_operation(format!("创建用户失败: {}", e)),
        })?;

        info!("User registered: id={}", model.id);
        Ok(model_to_user(model))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_email", self.retry_policy, || async {
            user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_id", self.retry_policy, || async {
            user::Entity::find_by_id(id).one(db).await
        })
        .await?;

        Ok(model.map(model_to_user))
    }

    /// 部分更新个人资料，字段为 None 时保持原值
    pub async fn update_user_profile(&self, id: i32, update: UserProfileUpdate) -> Result<User> {
        use sea_orm::ActiveValue::Set;

        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| MediRemindError::not_found(format!("User {} not found", id)))?;

        let mut active = model.into_active_model();
        if let Some(full_name) = update.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(phone_number) = update.phone_number {
            active.phone_number = Set(Some(phone_number));
        }
        if let Some(enabled) = update.email_notifications {
            active.email_notifications = Set(enabled);
        }

        let updated = active.update(&self.db).await?;
        Ok(model_to_user(updated))
    }
}
