//! SSE 提醒推送的数据源
//!
//! 每个连接周期性调用 [`ReminderFeed::poll_due_events`]，取出用户的 DUE 提醒并标记为 SENT。

use std::sync::Arc;

use chrono::SecondsFormat;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::storage::{ReminderDetail, ReminderStatus, SeaOrmStorage};

pub const HIGH_RISK_DISCLAIMER: &str = "This is an important medication. If you've missed this dose, please consult your healthcare provider before adjusting your schedule.";
pub const ACTION_LABEL: &str = "Mark as Taken";

/// 不附加到消息末尾的说明文字（小写比较）
const GENERIC_INSTRUCTIONS: [&str; 2] = ["test", "take as directed"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEvent {
    pub id: i32,
    pub medication_name: String,
    pub dosage: String,
    pub instructions: String,
    pub scheduled_time: String,
    pub message: String,
    pub is_high_risk: bool,
    pub disclaimer: Option<String>,
    pub action_label: String,
}

impl ReminderEvent {
    pub fn from_detail(detail: &ReminderDetail) -> Self {
        let med = &detail.medication;
        let instructions = med.instructions_or_default();
        let is_high_risk = med.is_high_risk();

        let mut message = format!("It's time for your {} ({})", med.name, med.dosage);
        if !GENERIC_INSTRUCTIONS.contains(&instructions.to_lowercase().as_str()) {
            message.push_str(" — ");
            message.push_str(instructions);
        }

        Self {
            id: detail.reminder.id,
            medication_name: med.name.clone(),
            dosage: med.dosage.clone(),
            instructions: instructions.to_string(),
            scheduled_time: detail
                .reminder
                .scheduled_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            message,
            is_high_risk,
            disclaimer: is_high_risk.then(|| HIGH_RISK_DISCLAIMER.to_string()),
            action_label: ACTION_LABEL.to_string(),
        }
    }

    /// `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

#[derive(Clone)]
pub struct ReminderFeed {
    storage: Arc<SeaOrmStorage>,
}

impl ReminderFeed {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 取出用户的 DUE 提醒并标记为 SENT
    ///
    /// 同一用户的多个连接同时轮询时，每条提醒只会交给其中一个。
    pub async fn poll_due_events(&self, user_id: i32) -> Result<Vec<ReminderEvent>> {
        let due = self
            .storage
            .user_reminders(user_id, &[ReminderStatus::Due], false, None)
            .await?;

        let mut events = Vec::with_capacity(due.len());
        for detail in &due {
            let claimed = self
                .storage
                .transition_reminder(detail.reminder.id, &[ReminderStatus::Due], ReminderStatus::Sent)
                .await?;
            if claimed {
                events.push(ReminderEvent::from_detail(detail));
            }
        }

        if !events.is_empty() {
            debug!("Relaying {} reminder(s) to user {}", events.len(), user_id);
        }
        Ok(events)
    }
}
