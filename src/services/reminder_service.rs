//! Reminder status and history queries

use std::sync::Arc;

use tracing::info;

use crate::errors::{MediRemindError, Result};
use crate::storage::{ReminderDetail, ReminderStatus, SeaOrmStorage};

/// 历史记录最多返回的条数
pub const HISTORY_LIMIT: u64 = 50;

/// 用户可以从这些状态直接标记为 TAKEN / SKIPPED
const ACTIONABLE: [ReminderStatus; 3] = [
    ReminderStatus::Pending,
    ReminderStatus::Due,
    ReminderStatus::Sent,
];

pub struct ReminderService {
    storage: Arc<SeaOrmStorage>,
}

impl ReminderService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn update_status(
        &self,
        user_id: i32,
        reminder_id: i32,
        status: ReminderStatus,
    ) -> Result<ReminderDetail> {
        if !status.is_resolved() {
            return Err(MediRemindError::validation(
                "status must be TAKEN or SKIPPED",
            ));
        }

        let mut detail = self.find_owned(user_id, reminder_id).await?;
        if detail.reminder.status == status {
            return Ok(detail);
        }
        if detail.reminder.status.is_resolved() {
            return Err(MediRemindError::conflict(format!(
                "Reminder already marked as {}",
                detail.reminder.status
            )));
        }

        if !self
            .storage
            .transition_reminder(reminder_id, &ACTIONABLE, status)
            .await?
        {
            return Err(MediRemindError::conflict(
                "Reminder status changed concurrently, retry",
            ));
        }

        info!("Reminder {} marked {} by user {}", reminder_id, status, user_id);
        detail.reminder.status = status;
        Ok(detail)
    }

    /// 按计划时间升序
    pub async fn list(
        &self,
        user_id: i32,
        status: Option<ReminderStatus>,
    ) -> Result<Vec<ReminderDetail>> {
        let statuses: Vec<ReminderStatus> = status.into_iter().collect();
        self.storage
            .user_reminders(user_id, &statuses, false, None)
            .await
    }

    /// TAKEN / SKIPPED，最新在前
    pub async fn history(&self, user_id: i32) -> Result<Vec<ReminderDetail>> {
        self.storage
            .user_reminders(
                user_id,
                &[ReminderStatus::Taken, ReminderStatus::Skipped],
                true,
                Some(HISTORY_LIMIT),
            )
            .await
    }

    async fn find_owned(&self, user_id: i32, reminder_id: i32) -> Result<ReminderDetail> {
        match self.storage.find_reminder_detail(reminder_id).await? {
            Some(detail) if detail.medication.user_id == user_id => Ok(detail),
            _ => Err(MediRemindError::not_found("Reminder not found")),
        }
    }
}
