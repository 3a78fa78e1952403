//! 提醒查询与状态流转

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};
use tracing::{debug, warn};

use super::SeaOrmStorage;
use super::converters::{model_to_medication, model_to_reminder};
use super::retry;
use crate::errors::Result;
use crate::storage::models::{Reminder, ReminderDetail, ReminderStatus};

use migration::entities::{medication, reminder};

fn status_values(statuses: &[ReminderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_ref().to_string()).collect()
}

impl SeaOrmStorage {
    pub async fn create_reminder(
        &self,
        medication_id: i32,
        scheduled_time: DateTime<Utc>,
    ) -> Result<Reminder> {
        use sea_orm::ActiveValue::*;

        let model = reminder::ActiveModel {
            id: NotSet,
            medication_id: Set(medication_id),
            scheduled_time: Set(scheduled_time),
            status: Set(ReminderStatus::Pending.as_ref().to_string()),
        }
        .insert(&self.db)
        .await?;

        Ok(model_to_reminder(model))
    }

    /// 同一药品同一时刻是否已有提醒
    pub async fn reminder_exists(
        &self,
        medication_id: i32,
        scheduled_time: DateTime<Utc>,
    ) -> Result<bool> {
        let count = reminder::Entity::find()
            .filter(reminder::Column::MedicationId.eq(medication_id))
            .filter(reminder::Column::ScheduledTime.eq(scheduled_time))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_reminder_detail(&self, id: i32) -> Result<Option<ReminderDetail>> {
        let Some(model) = reminder::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        Ok(self.attach_medications(vec![model]).await?.into_iter().next())
    }

    /// 条件更新：仅当当前状态属于 `from` 时改为 `to`，返回是否生效
    ///
    /// 多个 SSE 连接或 worker 实例并发时，只有一个能完成同一次流转。
    pub async fn transition_reminder(
        &self,
        id: i32,
        from: &[ReminderStatus],
        to: ReminderStatus,
    ) -> Result<bool> {
        let db = &self.db;
        let from_values = status_values(from);

        let result = retry::with_retry("transition_reminder", self.retry_policy, || {
            let from_values = from_values.clone();
            async move {
                reminder::Entity::update_many()
                    .col_expr(reminder::Column::Status, Expr::value(to.as_ref()))
                    .filter(reminder::Column::Id.eq(id))
                    .filter(reminder::Column::Status.is_in(from_values))
                    .exec(db)
                    .await
            }
        })
        .await?;

        debug!(
            "Reminder {} -> {} ({} rows)",
            id,
            to,
            result.rows_affected
        );
        Ok(result.rows_affected > 0)
    }

    /// 已到时间但仍为 PENDING 的提醒
    pub async fn pending_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderDetail>> {
        let db = &self.db;
        let models = retry::with_retry("pending_due_reminders", self.retry_policy, || async {
            reminder::Entity::find()
                .filter(reminder::Column::Status.eq(ReminderStatus::Pending.as_ref()))
                .filter(reminder::Column::ScheduledTime.lte(now))
                .order_by_asc(reminder::Column::ScheduledTime)
                .all(db)
                .await
        })
        .await?;

        self.attach_medications(models).await
    }

    /// 用户的提醒，`statuses` 为空表示不过滤
    pub async fn user_reminders(
        &self,
        user_id: i32,
        statuses: &[ReminderStatus],
        newest_first: bool,
        limit: Option<u64>,
    ) -> Result<Vec<ReminderDetail>> {
        let medication_ids: Vec<i32> = medication::Entity::find()
            .select_only()
            .column(medication::Column::Id)
            .filter(medication::Column::UserId.eq(user_id))
            .into_tuple::<i32>()
            .all(&self.db)
            .await?;

        if medication_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = reminder::Entity::find()
            .filter(reminder::Column::MedicationId.is_in(medication_ids));
        if !statuses.is_empty() {
            query = query.filter(reminder::Column::Status.is_in(status_values(statuses)));
        }
        query = if newest_first {
            query
                .order_by_desc(reminder::Column::ScheduledTime)
                .order_by_desc(reminder::Column::Id)
        } else {
            query
                .order_by_asc(reminder::Column::ScheduledTime)
                .order_by_asc(reminder::Column::Id)
        };
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let models = query.all(&self.db).await?;
        self.attach_medications(models).await
    }

    /// 最近一条提醒（按 id）
    pub async fn latest_reminder(&self) -> Result<Option<ReminderDetail>> {
        let Some(model) = reminder::Entity::find()
            .order_by_desc(reminder::Column::Id)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.attach_medications(vec![model]).await?.into_iter().next())
    }

    async fn attach_medications(&self, models: Vec<reminder::Model>) -> Result<Vec<ReminderDetail>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i32> = models.iter().map(|m| m.medication_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let medications: HashMap<i32, medication::Model> = medication::Entity::find()
            .filter(medication::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let details = models
            .into_iter()
            .filter_map(|model| match medications.get(&model.medication_id) {
                Some(med) => Some(ReminderDetail {
                    medication: model_to_medication(med.clone()),
                    reminder: model_to_reminder(model),
                }),
                None => {
                    warn!(
                        "Reminder {} references missing medication {}",
                        model.id, model.medication_id
                    );
                    None
                }
            })
            .collect();

        Ok(details)
    }
}
