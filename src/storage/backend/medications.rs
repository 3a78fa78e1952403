//! 药品及其提醒的写入

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_medication, model_to_reminder, new_medication_to_active_model};
use crate::errors::{MediRemindError, Result};
use crate::storage::models::{Medication, NewMedication, Reminder, ReminderStatus};

use migration::entities::{medication, reminder};

impl SeaOrmStorage {
    /// 在同一事务中创建药品和全部提醒（PENDING）
    pub async fn create_medication_with_reminders(
        &self,
        new: &NewMedication,
        times: &[DateTime<Utc>],
    ) -> Result<(Medication, Vec<Reminder>)> {
        use sea_orm::ActiveValue::*;

        let txn = self.db.begin().await?;

        let med_model = new_medication_to_active_model(new)
            .insert(&txn)
            .await
            .map_err(|e| MediRemindError::database_operation(format!("创建药品失败: {}", e)))?;

        let mut reminders = Vec::with_capacity(times.len());
        for time in times {
            let model = reminder::ActiveModel {
                id: NotSet,
                medication_id: Set(med_model.id),
                scheduled_time: Set(*time),
                status: Set(ReminderStatus::Pending.as_ref().to_string()),
            }
            .insert(&txn)
            .await?;
            reminders.push(model_to_reminder(model));
        }

        txn.commit().await?;

        info!(
            "Medication {} created for user {} with {} reminders",
            med_model.id,
            new.user_id,
            reminders.len()
        );
        Ok((model_to_medication(med_model), reminders))
    }

    pub async fn list_medications(&self, user_id: i32) -> Result<Vec<Medication>> {
        let models = medication::Entity::find()
            .filter(medication::Column::UserId.eq(user_id))
            .order_by_asc(medication::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(model_to_medication).collect())
    }

    pub async fn get_medication(&self, id: i32) -> Result<Option<Medication>> {
        let model = medication::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_medication))
    }

    /// 删除药品及其提醒，返回是否存在
    pub async fn delete_medication(&self, id: i32) -> Result<bool> {
        let txn = self.db.begin().await?;

        reminder::Entity::delete_many()
            .filter(reminder::Column::MedicationId.eq(id))
            .exec(&txn)
            .await?;
        let result = medication::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        if result.rows_affected > 0 {
            info!("Medication {} deleted", id);
        }
        Ok(result.rows_affected > 0)
    }
}
